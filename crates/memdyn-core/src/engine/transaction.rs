use super::error::EngineError;
use super::system::MembraneSystem;
use crate::core::mesh::MeshState;

/// Everything a step may change, captured before the step runs.
#[derive(Debug, Clone)]
pub struct Snapshot {
    state: MeshState,
    time: f64,
}

impl MembraneSystem {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state().clone(),
            time: self.time(),
        }
    }

    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.state_mut().restore_from(&snapshot.state);
        self.set_time(snapshot.time);
    }

    /// Runs `action` and rolls the system back if it fails, so a failed
    /// step never leaves a partial update behind.
    pub fn transaction<F, R>(&mut self, action: F) -> Result<R, EngineError>
    where
        F: FnOnce(&mut Self) -> Result<R, EngineError>,
    {
        let snapshot = self.snapshot();
        let result = action(self);
        if result.is_err() {
            self.restore(&snapshot);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::GeometryError;
    use crate::core::mesh::factory::icosphere;
    use crate::core::params::Parameters;
    use nalgebra::Vector3;

    fn system() -> MembraneSystem {
        let (topology, state) = icosphere(1.0, 1).unwrap();
        MembraneSystem::new(topology, state, Parameters::bending_only(1.0), 0).unwrap()
    }

    #[test]
    fn failed_transaction_restores_state_and_time() {
        let mut system = system();
        let before = system.state().positions().to_vec();
        let result: Result<(), EngineError> = system.transaction(|sys| {
            let n = sys.state().vertex_count();
            sys.state_mut().displace(&vec![Vector3::new(1.0, 0.0, 0.0); n], 0.5);
            sys.set_time(3.0);
            Err(GeometryError::NonFinite { quantity: "test" }.into())
        });
        assert!(result.is_err());
        assert_eq!(system.state().positions(), before.as_slice());
        assert_eq!(system.time(), 0.0);
    }

    #[test]
    fn successful_transaction_commits() {
        let mut system = system();
        system
            .transaction(|sys| {
                sys.set_time(1.5);
                Ok(())
            })
            .unwrap();
        assert_eq!(system.time(), 1.5);
    }
}
