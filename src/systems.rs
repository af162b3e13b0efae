//! System objects driven by the registry.

use crate::registry::Registry;

/// An application-defined process run against a registry.
///
/// Systems are owned by the registry and run in insertion order by
/// [`Registry::process_systems`]. The registry is the only state threaded
/// through them.
///
/// Any `FnMut(&mut Registry)` closure or function is a system; stateful
/// systems are written as move closures over their state.
///
/// ```
/// use cohort::Registry;
///
/// fn spawn(registry: &mut Registry) {
///     registry.create_entity().unwrap();
/// }
///
/// let mut registry = Registry::new();
/// registry.add_system(spawn);
/// registry.add_system(|registry: &mut Registry| {
///     registry.create_entity().unwrap();
/// });
///
/// registry.process_systems();
/// assert_eq!(registry.len(), 2);
/// ```
pub trait System: 'static {
    /// Runs the system against the registry.
    fn process(&mut self, registry: &mut Registry);
}

impl<F: FnMut(&mut Registry) + 'static> System for F {
    fn process(&mut self, registry: &mut Registry) {
        self(registry);
    }
}
