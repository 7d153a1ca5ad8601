use std::collections::HashMap;

/// 环境变量来源
///
/// 配置构建只通过这个接口读取键值，测试时可以直接传入 `HashMap`。
pub trait EnvSource: Send + Sync {
    fn get_env_var(&self, key: &str) -> Option<String>;
}

/// 进程环境变量
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get_env_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get_env_var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for HashMap<&'static str, &'static str> {
    fn get_env_var(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| value.to_string())
    }
}

/// 按顺序叠加多个来源，先命中者优先
#[derive(Default)]
pub struct LayeredEnv {
    layers: Vec<Box<dyn EnvSource>>,
}

impl LayeredEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个优先级更低的来源
    pub fn with_layer<S: EnvSource + 'static>(mut self, source: S) -> Self {
        self.layers.push(Box::new(source));
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl EnvSource for LayeredEnv {
    fn get_env_var(&self, key: &str) -> Option<String> {
        self.layers
            .iter()
            .find_map(|layer| layer.get_env_var(key))
    }
}
