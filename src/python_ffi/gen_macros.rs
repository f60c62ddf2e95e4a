/// Wraps a Rust object that a Python method may move out (e.g. `Net.build_trainer`).
/// Using the wrapper after that raises `RuntimeError` instead of panicking.
#[macro_export]
macro_rules! MakeConsumable {
    ($name:ident, $inner_type:ty, $obj_name:ident) => {
        pub(super) struct $name {
            obj: Option<$inner_type>,
        }
        impl $name {
            pub(super) fn acquire(val: $inner_type) -> Self {
                Self { obj: Some(val) }
            }
            fn consumed() -> pyo3::PyErr {
                pyo3::exceptions::PyRuntimeError::new_err(std::concat!(
                    "This ",
                    std::stringify!($obj_name),
                    " object is consumed and cannot be used"
                ))
            }
            pub(super) fn get_ref(&self) -> pyo3::PyResult<&$inner_type> {
                self.obj.as_ref().ok_or_else(Self::consumed)
            }
            pub(super) fn get_ref_mut(&mut self) -> pyo3::PyResult<&mut $inner_type> {
                self.obj.as_mut().ok_or_else(Self::consumed)
            }
            pub(super) fn release(&mut self) -> pyo3::PyResult<$inner_type> {
                self.obj.take().ok_or_else(Self::consumed)
            }
        }
    };
}

#[macro_export]
macro_rules! Impl_to_PyErr {
    (for $($t:ty),+) => {
        $(impl From<$t> for PyErr {
            fn from(err: $t) -> Self {
                pyo3::exceptions::PyValueError::new_err(format!("{}", err))
            }
        }
        )*
    }
}
