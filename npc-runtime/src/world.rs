//! # World 模块
//!
//! 宿主侧世界状态的 trait 缝隙：变量存储、背包、金币和随机数。
//!
//! ## 设计说明
//!
//! - Runtime 不拥有这些存储；它们由 Host 实现并以 `&mut` 传入 `tick`
//! - 表达式求值对存储是**只读**的（`random` 只消耗宿主的随机源，
//!   不触碰任何存储）；只有指令处理器做写入
//! - 多个 NPC 并发跑脚本时各持一个 Runtime 实例、共享同一个
//!   World 实现，线程安全是宿主的契约

use std::collections::HashMap;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::state::Value;

/// 宿主世界桥
///
/// 解释器通过它读写变量存储与背包。变量写入是 create-on-write：
/// 对不存在的名字写入即创建。
pub trait WorldBridge {
    /// 读取变量
    fn get_var(&self, name: &str) -> Option<Value>;

    /// 写入变量（不存在则创建）
    fn set_var(&mut self, name: &str, value: Value);

    /// 变量自增（不存在按 0 起步）
    fn increment_var(&mut self, name: &str, amount: &Value) {
        let current = self.get_var(name).unwrap_or(Value::Int(0));
        self.set_var(name, numeric_add(&current, amount, 1));
    }

    /// 变量自减（不存在按 0 起步）
    fn decrement_var(&mut self, name: &str, amount: &Value) {
        let current = self.get_var(name).unwrap_or(Value::Int(0));
        self.set_var(name, numeric_add(&current, amount, -1));
    }

    /// 背包中是否有指定物品
    fn has_item(&self, item_id: &str) -> bool;

    /// 指定物品的数量
    fn item_quantity(&self, item_id: &str) -> i64;

    /// 添加物品，返回是否成功（如物品 ID 未注册可拒绝）
    fn add_item(&mut self, item_id: &str, quantity: i64) -> bool;

    /// 移除物品，数量不足时返回 `false` 且不做部分移除
    fn remove_item(&mut self, item_id: &str, quantity: i64) -> bool;

    /// 当前金币
    fn gold(&self) -> i64;

    /// 增加金币
    fn add_gold(&mut self, amount: i64);

    /// 扣除金币，余额不足时返回 `false` 且不扣
    fn remove_gold(&mut self, amount: i64) -> bool;

    /// 闭区间 `[min, max]` 内的随机整数
    ///
    /// 随机源由宿主决定；测试宿主用预置序列保证确定性。
    fn random(&mut self, min: i64, max: i64) -> i64;
}

/// 宽松数值加法：两个整数保持整数，否则落到浮点
fn numeric_add(current: &Value, amount: &Value, sign: i64) -> Value {
    match (current, amount) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a + sign * b),
        _ => {
            let a = current.as_number().unwrap_or(0.0);
            let b = amount.as_number().unwrap_or(0.0);
            Value::Float(a + sign as f64 * b)
        }
    }
}

/// 内存世界实现
///
/// 供测试和简单宿主使用。随机数走预置队列（空时返回 `min`），
/// 保证回放的确定性；需要真随机的宿主应自行实现 [`WorldBridge`]。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryWorld {
    /// 变量存储
    pub variables: HashMap<String, Value>,
    /// 背包：物品 ID -> 数量
    pub items: HashMap<String, i64>,
    /// 金币
    pub gold: i64,
    /// 预置的随机数序列
    pub random_queue: VecDeque<i64>,
}

impl MemoryWorld {
    /// 创建空世界
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一个变量
    pub fn with_var(mut self, name: &str, value: Value) -> Self {
        self.variables.insert(name.to_string(), value);
        self
    }

    /// 预置一种物品
    pub fn with_item(mut self, item_id: &str, quantity: i64) -> Self {
        self.items.insert(item_id.to_string(), quantity);
        self
    }

    /// 预置金币
    pub fn with_gold(mut self, gold: i64) -> Self {
        self.gold = gold;
        self
    }

    /// 追加一个预置随机数
    pub fn queue_random(&mut self, value: i64) {
        self.random_queue.push_back(value);
    }
}

impl WorldBridge for MemoryWorld {
    fn get_var(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }

    fn set_var(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    fn has_item(&self, item_id: &str) -> bool {
        self.items.get(item_id).copied().unwrap_or(0) > 0
    }

    fn item_quantity(&self, item_id: &str) -> i64 {
        self.items.get(item_id).copied().unwrap_or(0)
    }

    fn add_item(&mut self, item_id: &str, quantity: i64) -> bool {
        if quantity < 0 {
            return false;
        }
        *self.items.entry(item_id.to_string()).or_insert(0) += quantity;
        true
    }

    fn remove_item(&mut self, item_id: &str, quantity: i64) -> bool {
        if quantity < 0 {
            return false;
        }
        let Some(current) = self.items.get_mut(item_id) else {
            return false;
        };
        if *current < quantity {
            return false;
        }
        *current -= quantity;
        if *current == 0 {
            self.items.remove(item_id);
        }
        true
    }

    fn gold(&self) -> i64 {
        self.gold
    }

    fn add_gold(&mut self, amount: i64) {
        self.gold += amount;
    }

    fn remove_gold(&mut self, amount: i64) -> bool {
        if amount > self.gold {
            return false;
        }
        self.gold -= amount;
        true
    }

    fn random(&mut self, min: i64, _max: i64) -> i64 {
        self.random_queue.pop_front().unwrap_or(min)
    }
}
