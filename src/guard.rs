//! Construct-once, configure-once wrapper for process-wide components.
//!
//! A [`Guard`] owns at most one instance of a [`Managed`] type. The first
//! successful [`Guard::initialize_from_context`] marks it configured; later
//! calls are recorded and ignored. [`Guard::reset`] exists for test isolation.

use crate::error::{AdvisoryError, FatalError, Result};
use crate::lock_unpoisoned;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

/// Capability contract for a component held by a [`Guard`].
pub trait Managed: Send + Sync + Sized + 'static {
    /// Everything `configure` needs.
    type Args;

    /// Name used in diagnostics.
    const NAME: &'static str;

    fn construct(args: &Self::Args) -> Result<Self>;

    fn configure(&self, args: Self::Args) -> Result<()>;

    /// Release external resources (sinks, files).
    fn shutdown(&self) {}

    /// Non-fatal diagnostics collected by the instance itself.
    fn instance_errors(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Components that may be built on first access without configuration.
pub trait AutoConstruct: Managed {
    fn construct_default() -> Self;
}

#[derive(Debug)]
struct GuardState<T> {
    instance: Option<Arc<T>>,
    configured: bool,
    errors: Vec<String>,
}

#[derive(Debug)]
pub struct Guard<T> {
    state: Mutex<GuardState<T>>,
}

impl<T: Managed> Guard<T> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(GuardState {
                instance: None,
                configured: false,
                errors: Vec::new(),
            }),
        }
    }

    /// The instance, if one has been constructed.
    pub fn get_instance(&self) -> Result<Arc<T>> {
        lock_unpoisoned(&self.state)
            .instance
            .clone()
            .ok_or(FatalError::NotInitialized { component: T::NAME })
    }

    pub fn is_configured(&self) -> bool {
        lock_unpoisoned(&self.state).configured
    }

    /// Construct (if needed) and configure the instance.
    ///
    /// Once configured, further calls log a warning, record one
    /// "already configured" entry each and return the existing instance.
    /// A failed configuration keeps the instance and may be retried.
    pub fn initialize_from_context(&self, args: T::Args) -> Result<Arc<T>> {
        let mut state = lock_unpoisoned(&self.state);

        if state.configured
            && let Some(existing) = state.instance.clone()
        {
            let advisory = AdvisoryError::already_configured(T::NAME);
            warn!(component = T::NAME, "{}", advisory);
            state.errors.push(advisory.to_string());
            return Ok(existing);
        }

        let instance = match state.instance.clone() {
            Some(existing) => existing,
            None => match T::construct(&args) {
                Ok(created) => {
                    let created = Arc::new(created);
                    state.instance = Some(Arc::clone(&created));
                    created
                }
                Err(e) => {
                    error!(component = T::NAME, error = %e, "Construction failed");
                    state.errors.push(e.to_string());
                    return Err(e);
                }
            },
        };

        match instance.configure(args) {
            Ok(()) => {
                state.configured = true;
                Ok(instance)
            }
            Err(e) => {
                error!(component = T::NAME, error = %e, "Configuration failed");
                state.errors.push(e.to_string());
                Err(e)
            }
        }
    }

    /// Guard-level errors plus the instance's own, deduplicated and sorted.
    pub fn get_initialization_errors(&self) -> Vec<String> {
        let state = lock_unpoisoned(&self.state);
        let mut all: BTreeSet<String> = state.errors.iter().cloned().collect();
        if let Some(instance) = &state.instance {
            all.extend(instance.instance_errors());
        }
        all.into_iter().collect()
    }

    /// Shut the instance down and forget everything.
    pub fn reset(&self) {
        let instance = {
            let mut state = lock_unpoisoned(&self.state);
            state.configured = false;
            state.errors.clear();
            state.instance.take()
        };
        if let Some(instance) = instance {
            instance.shutdown();
        }
    }
}

impl<T: AutoConstruct> Guard<T> {
    /// The instance, constructing a default one on first access.
    pub fn get_or_construct(&self) -> Arc<T> {
        let mut state = lock_unpoisoned(&self.state);
        Arc::clone(
            state
                .instance
                .get_or_insert_with(|| Arc::new(T::construct_default())),
        )
    }
}

impl<T: Managed> Default for Guard<T> {
    fn default() -> Self {
        Self::new()
    }
}
