mod canadian;
