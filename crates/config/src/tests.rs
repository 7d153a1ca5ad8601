use std::collections::HashMap;

use chrono::NaiveTime;

use svchost_errors::HostError;

use crate::env::{EnvSource, LayeredEnv};
use crate::host_file::HostFileEnv;
use crate::models::{Config, CronSchedule, ExecutionMode, MessagingParams, MessagingType, TimeUnit};
use crate::validation::*;

fn env(pairs: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
    pairs.iter().copied().collect()
}

fn rabbitmq_env() -> HashMap<&'static str, &'static str> {
    env(&[
        ("MESSAGING_TYPE", "RabbitMqConnection"),
        ("PROCESSOR_TYPE", "TestProcessor"),
        ("PROCESSOR_MODULE", "test_module"),
        ("RABBITMQ_HOST", "localhost"),
        ("RABBITMQ_PORT", "5672"),
        ("RABBITMQ_USER", "guest"),
        ("RABBITMQ_PASSWORD", "guest"),
        ("RABBITMQ_VIRTUAL_HOST", "/"),
        ("QUEUE_NAME_PREFIX", "prefix_"),
        ("TestProcessor_QUEUE_NAME", "queue"),
    ])
}

fn cron_env(extra: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
    let mut vars = env(&[
        ("EXECUTION_TYPE", "CRON"),
        ("PROCESSOR_TYPE", "LoggingServiceProcessor"),
        ("PROCESSOR_MODULE", "builtin"),
    ]);
    vars.extend(extra.iter().copied());
    vars
}

fn issue_fields(err: &HostError) -> Vec<&str> {
    err.validation_issues()
        .iter()
        .map(|issue| issue.field.as_str())
        .collect()
}

mod messaging_and_execution_type {
    use super::*;

    #[test]
    fn test_valid_rabbitmq() {
        let vars = env(&[("MESSAGING_TYPE", "RabbitMqConnection")]);
        let result = validate_messaging_and_execution_type(&vars, ExecutionMode::Message);
        assert_eq!(result.unwrap(), MessagingType::RabbitMq);
    }

    #[test]
    fn test_valid_sqs() {
        let vars = env(&[("MESSAGING_TYPE", "SqsConnection")]);
        let result = validate_messaging_and_execution_type(&vars, ExecutionMode::Message);
        assert_eq!(result.unwrap(), MessagingType::Sqs);
    }

    #[test]
    fn test_invalid_messaging_type() {
        let vars = env(&[("MESSAGING_TYPE", "KafkaConnection")]);
        let err = validate_messaging_and_execution_type(&vars, ExecutionMode::Message).unwrap_err();
        assert_eq!(issue_fields(&err), vec!["MESSAGING_TYPE"]);
    }

    #[test]
    fn test_cron_skips_messaging_type() {
        let vars = env(&[("MESSAGING_TYPE", "whatever")]);
        let result = validate_messaging_and_execution_type(&vars, ExecutionMode::Cron);
        assert_eq!(result.unwrap(), MessagingType::None);
    }

    #[test]
    fn test_messaging_type_is_case_sensitive() {
        for value in ["rabbitmqconnection", "SQSCONNECTION"] {
            let vars: HashMap<&'static str, &'static str> =
                HashMap::from([("MESSAGING_TYPE", value)]);
            assert!(validate_messaging_and_execution_type(&vars, ExecutionMode::Message).is_err());
        }
    }
}

mod processor_config {
    use super::*;

    #[test]
    fn test_valid() {
        let vars = env(&[("PROCESSOR_TYPE", "TestProcessor"), ("PROCESSOR_MODULE", "m")]);
        let (processor_type, module) = validate_processor_config(&vars).unwrap();
        assert_eq!(processor_type, "TestProcessor");
        assert_eq!(module, "m");
    }

    #[test]
    fn test_missing_type() {
        let vars = env(&[("PROCESSOR_MODULE", "m")]);
        let err = validate_processor_config(&vars).unwrap_err();
        assert_eq!(issue_fields(&err), vec!["PROCESSOR_TYPE"]);
    }

    #[test]
    fn test_missing_module() {
        let vars = env(&[("PROCESSOR_TYPE", "TestProcessor")]);
        let err = validate_processor_config(&vars).unwrap_err();
        assert_eq!(issue_fields(&err), vec!["PROCESSOR_MODULE"]);
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let vars = env(&[("PROCESSOR_TYPE", ""), ("PROCESSOR_MODULE", "m")]);
        assert!(validate_processor_config(&vars).is_err());
    }
}

mod cron_config {
    use super::*;

    #[test]
    fn test_expressions_valid() {
        let expressions = validate_cron_expressions("0 0 * * *,*/5 * * * *").unwrap();
        assert_eq!(expressions, vec!["0 0 * * *", "*/5 * * * *"]);
    }

    #[test]
    fn test_expressions_whitespace_after_comma_accepted() {
        let expressions = validate_cron_expressions("0 0 * * *, 30 12 * * 1").unwrap();
        assert_eq!(expressions.len(), 2);
        assert_eq!(expressions[1], "30 12 * * 1");
    }

    #[test]
    fn test_expressions_report_every_invalid_entry() {
        let err = validate_cron_expressions("0 0 * * *,invalid,61 * * * *").unwrap_err();
        let issues = err.validation_issues();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].value.as_deref(), Some("invalid"));
        assert_eq!(issues[1].value.as_deref(), Some("61 * * * *"));
    }

    #[test]
    fn test_time_amount() {
        let integer = env(&[("CRON_TIME_AMOUNT", "30")]);
        assert_eq!(validate_cron_time_amount(&integer).unwrap(), 30.0);

        let float = env(&[("CRON_TIME_AMOUNT", "1.5")]);
        assert_eq!(validate_cron_time_amount(&float).unwrap(), 1.5);

        assert!(validate_cron_time_amount(&env(&[])).is_err());
        assert!(validate_cron_time_amount(&env(&[("CRON_TIME_AMOUNT", "abc")])).is_err());
        assert!(validate_cron_time_amount(&env(&[("CRON_TIME_AMOUNT", "0")])).is_err());
        assert!(validate_cron_time_amount(&env(&[("CRON_TIME_AMOUNT", "-5")])).is_err());
        assert!(validate_cron_time_amount(&env(&[("CRON_TIME_AMOUNT", "inf")])).is_err());
    }

    #[test]
    fn test_time_unit() {
        let cases = [
            ("seconds", TimeUnit::Seconds),
            ("SECONDS", TimeUnit::Seconds),
            ("hours", TimeUnit::Hours),
            ("days", TimeUnit::Days),
            ("weeks", TimeUnit::Weeks),
        ];
        for (raw, expected) in cases {
            let vars: HashMap<&'static str, &'static str> =
                HashMap::from([("CRON_TIME_UNIT", raw)]);
            assert_eq!(validate_cron_time_unit(&vars).unwrap(), expected);
        }

        assert!(validate_cron_time_unit(&env(&[("CRON_TIME_UNIT", "invalid")])).is_err());
        assert!(validate_cron_time_unit(&env(&[])).is_err());
    }

    #[test]
    fn test_run_at() {
        let vars = env(&[("CRON_RUN_AT", "10:30")]);
        assert_eq!(
            validate_cron_run_at(&vars, TimeUnit::Days).unwrap(),
            NaiveTime::from_hms_opt(10, 30, 0)
        );

        let vars = env(&[("CRON_RUN_AT", "23:59:30")]);
        assert_eq!(
            validate_cron_run_at(&vars, TimeUnit::Days).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 30)
        );

        assert_eq!(validate_cron_run_at(&env(&[]), TimeUnit::Hours).unwrap(), None);
    }

    #[test]
    fn test_run_at_requires_days() {
        let vars = env(&[("CRON_RUN_AT", "10:00")]);
        let err = validate_cron_run_at(&vars, TimeUnit::Hours).unwrap_err();
        assert_eq!(issue_fields(&err), vec!["CRON_RUN_AT"]);
    }

    #[test]
    fn test_run_at_malformed() {
        let vars = env(&[("CRON_RUN_AT", "25:99")]);
        assert!(validate_cron_run_at(&vars, TimeUnit::Days).is_err());
    }

    #[test]
    fn test_run_at_startup() {
        assert!(parse_run_at_startup(&env(&[("RUN_AT_STARTUP", "true")])));
        assert!(parse_run_at_startup(&env(&[("RUN_AT_STARTUP", "TRUE")])));
        assert!(!parse_run_at_startup(&env(&[("RUN_AT_STARTUP", "false")])));
        assert!(!parse_run_at_startup(&env(&[("RUN_AT_STARTUP", "yes")])));
        assert!(!parse_run_at_startup(&env(&[])));
    }

    #[test]
    fn test_convenience_fields() {
        let vars = env(&[
            ("CRON_TIME_AMOUNT", "2"),
            ("CRON_TIME_UNIT", "days"),
            ("CRON_RUN_AT", "10:00"),
        ]);
        let schedule = validate_cron_convenience_fields(&vars).unwrap();
        assert_eq!(
            schedule,
            CronSchedule::Interval {
                amount: 2.0,
                unit: TimeUnit::Days,
                run_at: NaiveTime::from_hms_opt(10, 0, 0),
            }
        );

        let bad_amount = env(&[("CRON_TIME_AMOUNT", "x"), ("CRON_TIME_UNIT", "days")]);
        assert!(validate_cron_convenience_fields(&bad_amount).is_err());

        let bad_unit = env(&[("CRON_TIME_AMOUNT", "1"), ("CRON_TIME_UNIT", "years")]);
        assert!(validate_cron_convenience_fields(&bad_unit).is_err());
    }

    #[test]
    fn test_interval_bounds() {
        let fractional_day = env(&[
            ("CRON_TIME_AMOUNT", "0.5"),
            ("CRON_TIME_UNIT", "days"),
            ("CRON_RUN_AT", "00:30"),
        ]);
        assert_eq!(
            validate_cron_convenience_fields(&fractional_day).unwrap(),
            CronSchedule::Interval {
                amount: 0.5,
                unit: TimeUnit::Days,
                run_at: NaiveTime::from_hms_opt(0, 30, 0),
            }
        );

        let nanosecond = env(&[("CRON_TIME_AMOUNT", "0.000000001"), ("CRON_TIME_UNIT", "seconds")]);
        assert!(validate_cron_convenience_fields(&nanosecond).is_ok());

        let century = env(&[("CRON_TIME_AMOUNT", "5200"), ("CRON_TIME_UNIT", "weeks")]);
        assert!(validate_cron_convenience_fields(&century).is_ok());

        for (amount, unit) in [
            ("1e-12", "seconds"),
            ("1e300", "weeks"),
            ("1.7976931348623157e308", "seconds"),
            ("36501", "days"),
        ] {
            let vars: HashMap<&'static str, &'static str> =
                HashMap::from([("CRON_TIME_AMOUNT", amount), ("CRON_TIME_UNIT", unit)]);
            let err = validate_cron_convenience_fields(&vars).unwrap_err();
            assert_eq!(issue_fields(&err), vec!["CRON_TIME_AMOUNT"], "{amount} {unit}");
        }
    }

    #[test]
    fn test_overflowing_interval_rejected_by_config() {
        let vars = cron_env(&[("CRON_TIME_AMOUNT", "1e300"), ("CRON_TIME_UNIT", "weeks")]);
        let err = Config::from_source(&vars).unwrap_err();
        assert!(matches!(err, HostError::Validation(_)));
        assert_eq!(issue_fields(&err), vec!["CRON_TIME_AMOUNT"]);
    }

    #[test]
    fn test_not_cron_returns_none() {
        let vars = env(&[("CRON_EXPRESSIONS", "invalid")]);
        assert_eq!(validate_cron_config(&vars, ExecutionMode::Message).unwrap(), None);
    }

    #[test]
    fn test_expressions_take_precedence_over_convenience_fields() {
        let vars = env(&[
            ("CRON_EXPRESSIONS", "0 0 * * *"),
            ("CRON_TIME_AMOUNT", "not-a-number"),
        ]);
        let settings = validate_cron_config(&vars, ExecutionMode::Cron)
            .unwrap()
            .unwrap();
        assert_eq!(
            settings.schedule,
            CronSchedule::Expressions(vec!["0 0 * * *".to_string()])
        );
    }

    #[test]
    fn test_run_at_startup_honoured_with_expressions() {
        let vars = env(&[("CRON_EXPRESSIONS", "0 0 * * *"), ("RUN_AT_STARTUP", "True")]);
        let settings = validate_cron_config(&vars, ExecutionMode::Cron)
            .unwrap()
            .unwrap();
        assert!(settings.run_at_startup);
    }
}

mod messaging_params {
    use super::*;

    #[test]
    fn test_rabbitmq_basic() {
        let (params, num_threads) = setup_rabbitmq_params(&rabbitmq_env()).unwrap();
        assert_eq!(num_threads, 1);
        match params {
            MessagingParams::RabbitMq {
                host,
                port,
                user,
                virtual_host,
                consume_config_path,
                ..
            } => {
                assert_eq!(host, "localhost");
                assert_eq!(port, 5672);
                assert_eq!(user.as_deref(), Some("guest"));
                assert_eq!(virtual_host.as_deref(), Some("/"));
                assert!(consume_config_path.is_none());
            }
            other => panic!("unexpected params: {other:?}"),
        }
    }

    #[test]
    fn test_rabbitmq_with_threads() {
        let mut vars = rabbitmq_env();
        vars.insert("RABBITMQ_NUM_THREADS", "10");
        let (_, num_threads) = setup_rabbitmq_params(&vars).unwrap();
        assert_eq!(num_threads, 10);
    }

    #[test]
    fn test_rabbitmq_invalid_threads() {
        for value in ["invalid", "0", "-3", "2.5"] {
            let mut vars = rabbitmq_env();
            vars.insert("RABBITMQ_NUM_THREADS", value);
            let err = setup_rabbitmq_params(&vars).unwrap_err();
            assert_eq!(issue_fields(&err), vec!["RABBITMQ_NUM_THREADS"]);
        }
    }

    #[test]
    fn test_rabbitmq_port_errors_are_parse_errors() {
        for value in ["abc", "5672.5", "70000"] {
            let mut vars = rabbitmq_env();
            vars.insert("RABBITMQ_PORT", value);
            let err = setup_rabbitmq_params(&vars).unwrap_err();
            assert!(matches!(err, HostError::Parse { ref field, .. } if field == "RABBITMQ_PORT"));
        }

        let mut vars = rabbitmq_env();
        vars.remove("RABBITMQ_PORT");
        let err = setup_rabbitmq_params(&vars).unwrap_err();
        assert!(matches!(err, HostError::Parse { value: None, .. }));
    }

    #[test]
    fn test_rabbitmq_missing_host() {
        let mut vars = rabbitmq_env();
        vars.remove("RABBITMQ_HOST");
        let err = setup_rabbitmq_params(&vars).unwrap_err();
        assert_eq!(issue_fields(&err), vec!["RABBITMQ_HOST"]);
    }

    #[test]
    fn test_sqs_with_secret_access_key() {
        let vars = env(&[
            ("AWS_ACCESS_KEY_ID", "test_key"),
            ("AWS_SECRET_ACCESS_KEY", "test_secret"),
            ("AWS_REGION", "us-east-1"),
        ]);
        match setup_sqs_params(&vars) {
            MessagingParams::Sqs {
                access_key_id,
                secret_access_key,
                region,
                ..
            } => {
                assert_eq!(access_key_id.as_deref(), Some("test_key"));
                assert_eq!(secret_access_key.as_deref(), Some("test_secret"));
                assert_eq!(region.as_deref(), Some("us-east-1"));
            }
            other => panic!("unexpected params: {other:?}"),
        }
    }

    #[test]
    fn test_sqs_access_key_secret_takes_precedence() {
        let vars = env(&[
            ("AWS_ACCESS_KEY_SECRET", "secret_from_access_key"),
            ("AWS_SECRET_ACCESS_KEY", "secret_from_secret_key"),
        ]);
        let MessagingParams::Sqs {
            secret_access_key, ..
        } = setup_sqs_params(&vars)
        else {
            panic!("expected sqs params");
        };
        assert_eq!(secret_access_key.as_deref(), Some("secret_from_access_key"));
    }

    #[test]
    fn test_cron_has_no_messaging_params() {
        let (params, num_threads) = setup_messaging_params(&env(&[]), MessagingType::None).unwrap();
        assert_eq!(params, MessagingParams::None);
        assert_eq!(num_threads, 1);
    }
}

mod from_source {
    use super::*;

    #[test]
    fn test_complete_rabbitmq_config() {
        let config = Config::from_source(&rabbitmq_env()).unwrap();
        assert_eq!(config.execution_mode, ExecutionMode::Message);
        assert_eq!(config.messaging_type(), MessagingType::RabbitMq);
        assert_eq!(config.processor_type, "TestProcessor");
        assert_eq!(config.processor_module, "test_module");
        assert_eq!(config.queue_name().as_deref(), Some("prefix_queue"));
        assert!(config.schedule.is_none());
        assert!(!config.run_at_startup);
    }

    #[test]
    fn test_processor_info_carries_queue_name() {
        let config = Config::from_source(&rabbitmq_env()).unwrap();
        let info = config.processor_info("2.0.1");
        assert_eq!(info.processor_type, "TestProcessor");
        assert_eq!(info.queue_name.as_deref(), Some("prefix_queue"));
        assert_eq!(info.version, "2.0.1");
    }

    #[test]
    fn test_missing_queue_part_gives_no_queue_name() {
        let mut vars = rabbitmq_env();
        vars.remove("QUEUE_NAME_PREFIX");
        let config = Config::from_source(&vars).unwrap();
        assert_eq!(config.queue_name(), None);
    }

    #[test]
    fn test_cron_interval_config() {
        let vars = cron_env(&[
            ("CRON_TIME_AMOUNT", "30"),
            ("CRON_TIME_UNIT", "seconds"),
            ("RUN_AT_STARTUP", "TRUE"),
        ]);
        let config = Config::from_source(&vars).unwrap();
        assert_eq!(config.messaging, MessagingParams::None);
        assert!(config.run_at_startup);
        assert_eq!(config.queue_name(), None);
        assert_eq!(
            config.schedule,
            Some(CronSchedule::Interval {
                amount: 30.0,
                unit: TimeUnit::Seconds,
                run_at: None,
            })
        );
    }

    #[test]
    fn test_pipeline_stops_at_first_failure() {
        let vars = env(&[("MESSAGING_TYPE", "Unknown"), ("RABBITMQ_PORT", "abc")]);
        let err = Config::from_source(&vars).unwrap_err();
        assert_eq!(issue_fields(&err), vec!["MESSAGING_TYPE"]);
    }

    #[test]
    fn test_missing_processor_fails() {
        let mut vars = rabbitmq_env();
        vars.remove("PROCESSOR_MODULE");
        let err = Config::from_source(&vars).unwrap_err();
        assert!(err.is_startup_error());
        assert_eq!(issue_fields(&err), vec!["PROCESSOR_MODULE"]);
    }

    #[test]
    fn test_invalid_cron_fails() {
        let vars = cron_env(&[("CRON_EXPRESSIONS", "not a cron")]);
        assert!(Config::from_source(&vars).is_err());

        let vars = cron_env(&[
            ("CRON_TIME_AMOUNT", "1"),
            ("CRON_TIME_UNIT", "hours"),
            ("CRON_RUN_AT", "10:00"),
        ]);
        let err = Config::from_source(&vars).unwrap_err();
        assert_eq!(issue_fields(&err), vec!["CRON_RUN_AT"]);
    }

    #[test]
    fn test_invalid_messaging_params_fails() {
        let mut vars = rabbitmq_env();
        vars.insert("RABBITMQ_NUM_THREADS", "invalid");
        assert!(Config::from_source(&vars).is_err());
    }

    #[test]
    fn test_host_file_defaults_are_overridden_by_env() {
        let host_file = HostFileEnv::parse(
            r#"
            [env]
            EXECUTION_TYPE = "CRON"
            PROCESSOR_TYPE = "FromFile"
            PROCESSOR_MODULE = "builtin"
            CRON_TIME_AMOUNT = 5
            CRON_TIME_UNIT = "minutes"
            "#,
        )
        .unwrap();
        let overrides = env(&[("PROCESSOR_TYPE", "FromEnv")]);

        let layered = LayeredEnv::new().with_layer(overrides).with_layer(host_file);
        assert_eq!(layered.get_env_var("CRON_TIME_UNIT").as_deref(), Some("minutes"));

        let config = Config::from_source(&layered).unwrap();
        assert_eq!(config.processor_type, "FromEnv");
        assert_eq!(
            config.schedule,
            Some(CronSchedule::Interval {
                amount: 5.0,
                unit: TimeUnit::Minutes,
                run_at: None,
            })
        );
    }
}
