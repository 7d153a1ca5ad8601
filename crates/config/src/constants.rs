// 宿主读取的环境变量名及默认值

/// 环境变量名
pub mod env_keys {
    pub const EXECUTION_TYPE: &str = "EXECUTION_TYPE";
    pub const MESSAGING_TYPE: &str = "MESSAGING_TYPE";
    pub const PROCESSOR_TYPE: &str = "PROCESSOR_TYPE";
    pub const PROCESSOR_MODULE: &str = "PROCESSOR_MODULE";

    pub const CRON_EXPRESSIONS: &str = "CRON_EXPRESSIONS";
    pub const CRON_TIME_AMOUNT: &str = "CRON_TIME_AMOUNT";
    pub const CRON_TIME_UNIT: &str = "CRON_TIME_UNIT";
    pub const CRON_RUN_AT: &str = "CRON_RUN_AT";
    pub const RUN_AT_STARTUP: &str = "RUN_AT_STARTUP";

    pub const QUEUE_NAME_PREFIX: &str = "QUEUE_NAME_PREFIX";
    /// 处理器队列名的后缀，完整键为 `{PROCESSOR_TYPE}_QUEUE_NAME`
    pub const QUEUE_NAME_SUFFIX: &str = "_QUEUE_NAME";

    pub const RABBITMQ_HOST: &str = "RABBITMQ_HOST";
    pub const RABBITMQ_PORT: &str = "RABBITMQ_PORT";
    pub const RABBITMQ_USER: &str = "RABBITMQ_USER";
    pub const RABBITMQ_PASSWORD: &str = "RABBITMQ_PASSWORD";
    pub const RABBITMQ_VIRTUAL_HOST: &str = "RABBITMQ_VIRTUAL_HOST";
    pub const RABBITMQ_NUM_THREADS: &str = "RABBITMQ_NUM_THREADS";
    pub const CONSUME_CONFIG_FILE_PATH: &str = "CONSUME_CONFIG_FILE_PATH";

    pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
    pub const AWS_ACCESS_KEY_SECRET: &str = "AWS_ACCESS_KEY_SECRET";
    pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
    pub const AWS_REGION: &str = "AWS_REGION";
}

/// 取值常量
pub mod values {
    pub const EXECUTION_TYPE_CRON: &str = "CRON";
    pub const RABBITMQ_CONNECTION: &str = "RabbitMqConnection";
    pub const SQS_CONNECTION: &str = "SqsConnection";
    pub const SUPPORTED_TIME_UNITS: [&str; 5] = ["seconds", "minutes", "hours", "days", "weeks"];
    /// 调度间隔上限：100年
    pub const MAX_INTERVAL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

    /// 默认消费者数量
    pub const DEFAULT_NUM_THREADS: usize = 1;
    pub const DEFAULT_RABBITMQ_USER: &str = "guest";
    pub const DEFAULT_RABBITMQ_PASSWORD: &str = "guest";
    pub const DEFAULT_RABBITMQ_VIRTUAL_HOST: &str = "/";
}
