// Tests for loading and saving planner configuration files

#[cfg(test)]
mod tests {
    use std::fs;
    use tempfile::tempdir;
    use toolpath_planner::config::{parse_config, save_config};
    use toolpath_planner::motion::{CollinearJunction, ReversalJunction};
    use toolpath_planner::{load_config, ConfigError, MotionPlanner, MoveCommand, PlannerConfig, Vector3};

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("planner.toml");

        let mut config = PlannerConfig::default();
        config.limits.v_max = Vector3::new(120.0, 100.0, 10.0);
        config.limits.junction_deviation = 0.02;
        config.planner.exit_velocity = 1.5;
        config.planner.nominal_speed = Some(80.0);
        config.planner.origin = Vector3::new(0.0, 0.0, 5.0);
        config.planner.reversal_junction = ReversalJunction::FullStop;

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_config_omits_nominal_speed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defaults.toml");
        save_config(&PlannerConfig::default(), &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[limits]"));
        assert!(!contents.contains("nominal_speed"));
        assert_eq!(parse_config(&contents).unwrap(), PlannerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(&path, "[planner]\ncollinear_junction = \"unlimited\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.limits, PlannerConfig::default().limits);
        assert_eq!(config.planner.collinear_junction, CollinearJunction::Unlimited);
        assert_eq!(config.planner.reversal_junction, ReversalJunction::Unconstrained);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = load_config(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[limits]\na_max = { x = -1.0, y = 50.0, z = 25.0 }\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "[planner]\nreversal_junction = \"sometimes\"\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_loaded_config_drives_planner() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slow.toml");
        fs::write(&path, "[planner]\nnominal_speed = 10.0\n").unwrap();

        let planner = MotionPlanner::new_from_config(&load_config(&path).unwrap()).unwrap();
        let trajectory = planner.plan(&[MoveCommand::xy(100.0, 0.0, "G1 X100")]).unwrap();
        assert!((trajectory.peak_velocity() - 10.0).abs() < 1e-9);
    }
}
