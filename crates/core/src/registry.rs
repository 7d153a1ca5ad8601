use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use svchost_errors::{HostError, HostResult};

use crate::{models::ProcessorParams, traits::ServiceProcessor};

/// 处理器构造函数
pub type ProcessorFactory =
    Arc<dyn Fn(&ProcessorParams) -> HostResult<Arc<dyn ServiceProcessor>> + Send + Sync>;

/// 处理器注册表
///
/// 以 `模块 -> 类型 -> 构造函数` 两级映射代替运行时反射查找，
/// 进程启动时填充，之后只读。
#[derive(Default, Clone)]
pub struct ProcessorRegistry {
    modules: BTreeMap<String, BTreeMap<String, ProcessorFactory>>,
}

/// 解析结果：处理器实例及其版本
pub struct ResolvedProcessor {
    pub processor: Arc<dyn ServiceProcessor>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorDescriptor {
    pub module: String,
    pub processor_type: String,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器构造函数，同名注册会覆盖旧值
    pub fn register<F>(&mut self, module: &str, processor_type: &str, factory: F) -> &mut Self
    where
        F: Fn(&ProcessorParams) -> HostResult<Arc<dyn ServiceProcessor>> + Send + Sync + 'static,
    {
        let previous = self
            .modules
            .entry(module.to_string())
            .or_default()
            .insert(processor_type.to_string(), Arc::new(factory));

        if previous.is_some() {
            warn!("处理器 {}::{} 被重复注册，覆盖旧的构造函数", module, processor_type);
        } else {
            debug!("注册处理器 {}::{}", module, processor_type);
        }
        self
    }

    /// 查找并实例化处理器
    pub fn resolve(
        &self,
        module: &str,
        processor_type: &str,
        params: &ProcessorParams,
    ) -> HostResult<ResolvedProcessor> {
        let types = self
            .modules
            .get(module)
            .ok_or_else(|| HostError::ModuleNotFound {
                module: module.to_string(),
            })?;

        let factory = types
            .get(processor_type)
            .ok_or_else(|| HostError::ProcessorTypeNotFound {
                module: module.to_string(),
                processor_type: processor_type.to_string(),
            })?;

        let processor = factory(params)?;
        let version = processor.version().to_string();
        Ok(ResolvedProcessor { processor, version })
    }

    pub fn contains(&self, module: &str, processor_type: &str) -> bool {
        self.modules
            .get(module)
            .is_some_and(|types| types.contains_key(processor_type))
    }

    /// 按模块、类型排序列出全部注册项
    pub fn describe(&self) -> Vec<ProcessorDescriptor> {
        self.modules
            .iter()
            .flat_map(|(module, types)| {
                types.keys().map(move |processor_type| ProcessorDescriptor {
                    module: module.clone(),
                    processor_type: processor_type.clone(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
