use rand::Rng;
use rand_pcg::Pcg64Mcg;
use twin96::linalg::DVector;
use twin96::obs::{LinearOperator, ObservationOperator, Quadratic};

fn random_state(dim: usize, rng: &mut Pcg64Mcg) -> DVector<f64> {
    DVector::from_fn(dim, |_, _| rng.gen_range(-10.0..10.0))
}

#[test]
fn linear_operators_apply_their_matrix() {
    let mut rng = Pcg64Mcg::new(5);
    let operators = vec![
        LinearOperator::identity(12),
        LinearOperator::every_nth(12, 0, 3).unwrap(),
        LinearOperator::moving_average(12, 5).unwrap(),
    ];
    for h in operators {
        let x = random_state(12, &mut rng);
        let y = h.observe(&x).unwrap();
        assert_eq!(y, h.matrix() * &x, "observe must equal H·x for [{h}]");
        // The jacobian of a linear operator is its matrix, anywhere.
        assert_eq!(&h.jacobian(&x).unwrap(), h.matrix());
        assert_eq!(y.len(), h.obs_dim());
    }
}

#[test]
fn every_other_gridpoint_network() {
    let h = LinearOperator::every_nth(40, 0, 2).unwrap();
    assert_eq!(h.obs_dim(), 20);
    let x = DVector::from_fn(40, |i, _| i as f64);
    let y = h.observe(&x).unwrap();
    for (r, value) in y.iter().enumerate() {
        assert_eq!(*value, (2 * r) as f64);
    }
}

#[test]
fn quadratic_operator_is_state_dependent() {
    let h = Quadratic::new(4);
    let x = DVector::from_vec(vec![1.0, -2.0, 0.0, 3.0]);
    let y = h.observe(&x).unwrap();
    assert_eq!(y, DVector::from_vec(vec![0.5, 2.0, 0.0, 4.5]));

    // The jacobian changes with the state, unlike the linear operators.
    let jac_a = h.jacobian(&x).unwrap();
    let jac_b = h.jacobian(&DVector::from_element(4, 1.0)).unwrap();
    assert_ne!(jac_a, jac_b);
    assert_eq!(jac_a.diagonal(), x);
}

#[test]
fn operators_reject_foreign_dimensions() {
    let wrong = DVector::zeros(7);
    assert!(LinearOperator::identity(8).observe(&wrong).is_err());
    assert!(Quadratic::new(8).observe(&wrong).is_err());
    assert!(Quadratic::new(8).jacobian(&wrong).is_err());
}
