//! 变换管道（MutationPipeline）
//!
//! 由声明式映射（属性名 -> 单个变换或有序变换列表）在构造时编译一次，
//! 列表按顺序折叠为单个函数：`fold(list, input, |acc, f| f(acc))`。
//! 每次写入属性时透明地应用；未声明变换的属性原样通过。
//!
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// 单参数变换函数
pub type Mutator = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// 声明式的单条变换：单个函数或按顺序执行的函数列表
#[derive(Clone)]
pub enum Mutation {
    One(Mutator),
    Chain(Vec<Mutator>),
}

impl Mutation {
    pub fn one<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Mutation::One(Arc::new(f))
    }

    pub fn chain<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = Mutator>,
    {
        Mutation::Chain(steps.into_iter().collect())
    }

    fn compile(self) -> Mutator {
        match self {
            Mutation::One(f) => f,
            Mutation::Chain(steps) => {
                Arc::new(move |value| steps.iter().fold(value, |acc, step| step(acc)))
            }
        }
    }
}

/// 以 `Arc` 包装一个变换函数，便于放入 `Mutation::chain`
pub fn mutator<F>(f: F) -> Mutator
where
    F: Fn(Value) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 变换声明集合：属性名 -> 变换
#[derive(Clone, Default)]
pub struct Mutations {
    entries: BTreeMap<String, Mutation>,
}

impl Mutations {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为属性声明变换（同名覆盖）
    pub fn with(mut self, attribute: impl Into<String>, mutation: Mutation) -> Self {
        self.entries.insert(attribute.into(), mutation);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 编译后的变换管道
#[derive(Clone, Default)]
pub struct MutationPipeline {
    compiled: HashMap<String, Mutator>,
}

impl MutationPipeline {
    pub fn compile(mutations: Mutations) -> Self {
        let compiled = mutations
            .entries
            .into_iter()
            .map(|(attribute, mutation)| (attribute, mutation.compile()))
            .collect();
        Self { compiled }
    }

    /// 应用属性的变换；未声明的属性原样返回
    pub fn apply(&self, attribute: &str, value: Value) -> Value {
        match self.compiled.get(attribute) {
            Some(mutator) => mutator(value),
            None => value,
        }
    }

    pub fn has(&self, attribute: &str) -> bool {
        self.compiled.contains_key(attribute)
    }
}

impl fmt::Debug for MutationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attributes: Vec<&String> = self.compiled.keys().collect();
        attributes.sort();
        f.debug_struct("MutationPipeline")
            .field("attributes", &attributes)
            .finish()
    }
}
