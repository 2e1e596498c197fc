use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 出口：按名称调用 hook
///
/// The engine only knows hook names; whatever implements this trait decides
/// what a name means.
#[async_trait]
pub trait HookInvoker: Send + Sync {
    async fn invoke_hook(&self, hook_name: &str, payload: &Value) -> Result<()>;
}

/// 单个 hook
#[async_trait]
pub trait Hook: Send + Sync {
    /// 执行 hook
    async fn run(&self, payload: &Value) -> Result<()>;

    /// hook 名称
    fn name(&self) -> &str;

    /// 是否启用
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Adapts an async closure into a [`Hook`].
pub struct FnHook<F> {
    name: String,
    f: F,
}

impl<F> FnHook<F> {
    pub fn new<Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> Hook for FnHook<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn run(&self, payload: &Value) -> Result<()> {
        (self.f)(payload.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// hook 注册表
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Arc<dyn Hook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 hook，同名覆盖
    pub async fn register(&self, hook: Arc<dyn Hook>) {
        let mut hooks = self.hooks.write().await;
        info!("Registered hook: {}", hook.name());
        hooks.insert(hook.name().to_string(), hook);
    }

    pub async fn unregister(&self, name: &str) -> bool {
        let removed = self.hooks.write().await.remove(name).is_some();
        if removed {
            info!("Unregistered hook: {}", name);
        }
        removed
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.hooks.read().await.contains_key(name)
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.hooks.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl HookInvoker for HookRegistry {
    async fn invoke_hook(&self, hook_name: &str, payload: &Value) -> Result<()> {
        // Release the lock before running so slow hooks don't block registration.
        let hook = self
            .hooks
            .read()
            .await
            .get(hook_name)
            .cloned()
            .ok_or_else(|| anyhow!("hook not registered: {}", hook_name))?;

        if !hook.is_enabled() {
            debug!(hook = %hook_name, "Hook disabled, skipping");
            return Ok(());
        }

        hook.run(payload).await
    }
}
