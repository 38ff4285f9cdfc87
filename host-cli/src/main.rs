//! # 终端宿主
//!
//! 以终端为界面驱动 `npc-runtime` 的最小宿主：
//! 打印消息、读取选择、为 `wait` 计时、用一个简易收银循环
//! 扮演商店模态。演示 tick/输入回传的完整回路。

use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;

use npc_runtime::{
    ActorContext, Command, MemoryWorld, NpcRuntime, RuntimeInput, Script, ShopItem, Value,
    WaitingReason, WorldBridge,
};

#[derive(Parser)]
#[command(name = "host-cli", about = "在终端里运行一段 NPC 脚本")]
struct Args {
    /// 脚本文件路径
    script: PathBuf,

    /// NPC 显示名（作为消息的说话者）
    #[arg(long)]
    speaker: Option<String>,

    /// 玩家初始金币
    #[arg(long, default_value_t = 100)]
    gold: i64,
}

/// 终端世界：内存存储 + 真随机源
struct CliWorld {
    inner: MemoryWorld,
    rng: rand::rngs::ThreadRng,
}

impl CliWorld {
    fn new(gold: i64) -> Self {
        Self {
            inner: MemoryWorld::new().with_gold(gold),
            rng: rand::thread_rng(),
        }
    }
}

impl WorldBridge for CliWorld {
    fn get_var(&self, name: &str) -> Option<Value> {
        self.inner.get_var(name)
    }

    fn set_var(&mut self, name: &str, value: Value) {
        self.inner.set_var(name, value);
    }

    fn has_item(&self, item_id: &str) -> bool {
        self.inner.has_item(item_id)
    }

    fn item_quantity(&self, item_id: &str) -> i64 {
        self.inner.item_quantity(item_id)
    }

    fn add_item(&mut self, item_id: &str, quantity: i64) -> bool {
        self.inner.add_item(item_id, quantity)
    }

    fn remove_item(&mut self, item_id: &str, quantity: i64) -> bool {
        self.inner.remove_item(item_id, quantity)
    }

    fn gold(&self) -> i64 {
        self.inner.gold()
    }

    fn add_gold(&mut self, amount: i64) {
        self.inner.add_gold(amount);
    }

    fn remove_gold(&mut self, amount: i64) -> bool {
        self.inner.remove_gold(amount)
    }

    fn random(&mut self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .init();

    let args = Args::parse();
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("读取脚本失败: {}", args.script.display()))?;
    let script_id = args
        .script
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());

    let (script, diags) = Script::parse(&script_id, &text);
    for diag in &diags.diagnostics {
        eprintln!("{}", diag);
    }

    let mut runtime = NpcRuntime::new(script);
    if let Some(name) = &args.speaker {
        runtime = runtime.with_actor(ActorContext::new(&script_id).with_name(name));
    }

    let mut world = CliWorld::new(args.gold);
    let mut input: Option<RuntimeInput> = None;
    let mut pending_shop: Option<(String, Vec<ShopItem>)> = None;

    loop {
        let (commands, waiting) = runtime.tick(&mut world, input.take())?;

        for command in commands {
            execute(command, &mut pending_shop);
        }

        input = match waiting {
            WaitingReason::None => {
                if runtime.is_finished() {
                    break;
                }
                None
            }
            WaitingReason::WaitForDismiss => {
                prompt_line("  ▶ (回车继续)")?;
                Some(RuntimeInput::dismissed())
            }
            WaitingReason::WaitForChoice { choice_count } => {
                Some(RuntimeInput::choice(read_choice(choice_count)?))
            }
            WaitingReason::WaitForTime(duration) => {
                thread::sleep(duration);
                Some(RuntimeInput::elapsed())
            }
            WaitingReason::WaitForModal { kind } => {
                if let Some((name, items)) = pending_shop.take() {
                    run_shop(&name, &items, &mut world)?;
                }
                Some(RuntimeInput::modal_closed(kind))
            }
        };
    }

    println!("—— 交互结束 ——");
    Ok(())
}

/// 执行一条指令（渲染到终端）
fn execute(command: Command, pending_shop: &mut Option<(String, Vec<ShopItem>)>) {
    match command {
        Command::ShowMessage { speaker, text } => match speaker {
            Some(speaker) => println!("{}：{}", speaker, text),
            None => println!("{}", text),
        },
        Command::PresentChoices { options } => {
            for (index, option) in options.iter().enumerate() {
                println!("  [{}] {}", index, option);
            }
        }
        Command::OpenShop { name, items } => {
            *pending_shop = Some((name, items));
        }
        Command::PlaySound { sound_id } => println!("♪ ({})", sound_id),
        Command::Teleport { map_id, x, y } => println!("* 传送到 {} ({}, {})", map_id, x, y),
        Command::Heal { amount } => println!("* 恢复 {} 点生命", amount),
        Command::Damage { amount } => println!("* 受到 {} 点伤害", amount),
        Command::EndInteraction => {}
    }
}

/// 商店收银循环：买到离开为止（即脚本眼里的模态期间）
fn run_shop(name: &str, items: &[ShopItem], world: &mut CliWorld) -> Result<()> {
    println!("═══ {} ═══", name);
    loop {
        for (index, item) in items.iter().enumerate() {
            let stock = item
                .stock
                .map(|s| format!("（库存 {}）", s))
                .unwrap_or_default();
            println!("  [{}] {} — {} 金币{}", index, item.item_id, item.price, stock);
        }
        println!("  持有金币：{}", world.gold());

        let line = prompt_line("  输入编号购买，直接回车离开")?;
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let Ok(index) = line.parse::<usize>() else {
            println!("  无效输入");
            continue;
        };
        let Some(item) = items.get(index) else {
            println!("  没有这个编号");
            continue;
        };

        if !world.remove_gold(item.price) {
            println!("  金币不够。");
            continue;
        }
        world.add_item(&item.item_id, 1);
        println!("  买下了 {}。", item.item_id);
    }
}

/// 读取一个合法的选择下标
fn read_choice(choice_count: usize) -> Result<usize> {
    loop {
        let line = prompt_line("  选择编号")?;
        match line.trim().parse::<usize>() {
            Ok(index) if index < choice_count => return Ok(index),
            _ => println!("  请输入 0..{} 之间的编号", choice_count),
        }
    }
}

/// 打印提示并读取一行
fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}: ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}
