//! # Command 模块
//!
//! 定义 Runtime 向 Host 发出的全部指令。
//! Command 是 Runtime 对 Host 的**唯一**副作用出口。
//!
//! ## 设计原则
//!
//! - **声明式**：Command 描述"做什么"，不描述"怎么做"
//! - **无副作用**：Command 本身不执行任何操作
//! - **引擎无关**：不包含任何渲染/音频引擎的类型

use serde::{Deserialize, Serialize};

/// 商店模态的类型标识
///
/// `shop` 指令以 [`crate::state::WaitingReason::WaitForModal`] 挂起时用它，
/// Host 关闭商店后回传同名的 `ModalClosed`。
pub const SHOP_MODAL: &str = "SHOP";

/// 商店条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopItem {
    /// 物品 ID
    pub item_id: String,
    /// 单价（金币）
    pub price: i64,
    /// 库存（`None` = 不限量）
    pub stock: Option<i64>,
}

/// Runtime 向 Host 发出的指令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// 显示一条消息并等待玩家关闭
    ShowMessage {
        /// 说话者（None 表示旁白/系统消息）
        speaker: Option<String>,
        /// 消息文本
        text: String,
    },

    /// 显示选择框并等待玩家选择
    PresentChoices {
        /// 选项文本列表
        options: Vec<String>,
    },

    /// 打开商店模态界面
    ///
    /// Host 压入 `SHOP` 模态状态；交易（扣金币、给物品）在 Host 侧
    /// 进行，脚本在模态关闭前不会继续。
    OpenShop {
        /// 商店显示名
        name: String,
        /// 商品列表
        items: Vec<ShopItem>,
    },

    /// 播放音效
    PlaySound {
        /// 音效 ID
        sound_id: String,
    },

    /// 传送玩家
    Teleport {
        /// 目标地图 ID
        map_id: String,
        /// 目标横坐标（图块）
        x: i64,
        /// 目标纵坐标（图块）
        y: i64,
    },

    /// 为玩家恢复生命
    Heal {
        /// 恢复量
        amount: i64,
    },

    /// 对玩家造成伤害
    Damage {
        /// 伤害量
        amount: i64,
    },

    /// 交互结束（每个会话恰好发出一次）
    EndInteraction,
}

impl Command {
    /// 是否是会挂起脚本执行的指令
    pub fn causes_wait(&self) -> bool {
        matches!(
            self,
            Self::ShowMessage { .. } | Self::PresentChoices { .. } | Self::OpenShop { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_causes_wait() {
        let msg = Command::ShowMessage {
            speaker: None,
            text: "你好".to_string(),
        };
        assert!(msg.causes_wait());

        let shop = Command::OpenShop {
            name: "杂货铺".to_string(),
            items: vec![],
        };
        assert!(shop.causes_wait());

        let sound = Command::PlaySound {
            sound_id: "door_open".to_string(),
        };
        assert!(!sound.causes_wait());
        assert!(!Command::EndInteraction.causes_wait());
    }

    #[test]
    fn test_command_serialization_round_trip() {
        let cmd = Command::OpenShop {
            name: "武器店".to_string(),
            items: vec![ShopItem {
                item_id: "sword".to_string(),
                price: 200,
                stock: Some(1),
            }],
        };

        let json = serde_json::to_string(&cmd).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, back);
    }
}
