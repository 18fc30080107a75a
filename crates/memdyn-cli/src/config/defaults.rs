use memdyn::engine::config::IntegratorKind;

pub struct DefaultsConfig {
    pub integrator: IntegratorKind,
    pub time_step: f64,
    pub max_steps: u64,
    pub tolerance: f64,
    pub frame_period: u64,
    pub radius: f64,
    pub subdivisions: u32,
    pub edge_length: f64,
    pub rings: usize,
    pub bending_rigidity: f64,
    pub seed: u64,
    pub output_directory: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            integrator: IntegratorKind::ConjugateGradient,
            time_step: 0.01,
            max_steps: 1000,
            tolerance: 1e-6,
            frame_period: 100,
            radius: 1.0,
            subdivisions: 3,
            edge_length: 0.1,
            rings: 8,
            bending_rigidity: 1.0,
            seed: 0,
            output_directory: "trajectory".to_string(),
        }
    }
}
