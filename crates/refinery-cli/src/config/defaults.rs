pub struct DefaultsConfig {
    pub configuration_name: String,
    pub temperature: f64,
    pub iterations: usize,
    pub energy_log: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            configuration_name: "Configuration".to_string(),
            temperature: 300.0,
            iterations: 1,
            energy_log: true,
        }
    }
}
