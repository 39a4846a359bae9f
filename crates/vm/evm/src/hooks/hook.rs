use crate::{
    errors::{ContextResult, VMError},
    hooks::default_hook::DefaultHook,
    vm::VM,
};
use std::{cell::RefCell, rc::Rc};

/// Transaction-level logic that runs around the outermost frame.
pub trait Hook {
    fn prepare_execution(&mut self, vm: &mut VM<'_>) -> Result<(), VMError>;

    fn finalize_execution(
        &mut self,
        vm: &mut VM<'_>,
        report: &mut ContextResult,
    ) -> Result<(), VMError>;
}

pub fn default_hooks() -> Vec<Rc<RefCell<dyn Hook + 'static>>> {
    vec![Rc::new(RefCell::new(DefaultHook))]
}
