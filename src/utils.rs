//! 运行环境相关的小工具：计时、浏览器控制台日志、panic hook。
//!
//! 原生目标（`cargo test`）上不会调用任何 JS 导入函数。

use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// 毫秒级计时器：wasm 下使用 `Date.now()`，原生下使用 `Instant`。
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    #[cfg(target_arch = "wasm32")]
    started_ms: f64,
    #[cfg(not(target_arch = "wasm32"))]
    started: Instant,
}

impl Stopwatch {
    #[cfg(target_arch = "wasm32")]
    pub fn start() -> Self {
        Self {
            started_ms: web_sys::js_sys::Date::now(),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn elapsed_ms(&self) -> u64 {
        (web_sys::js_sys::Date::now() - self.started_ms).max(0.0) as u64
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// 与前端 `new Date().toLocaleString()` 一致的时间戳文本。
#[cfg(target_arch = "wasm32")]
pub fn timestamp_label() -> String {
    let now = web_sys::js_sys::Date::new_0();
    String::from(now.to_locale_string("default", &wasm_bindgen::JsValue::UNDEFINED))
}

#[cfg(not(target_arch = "wasm32"))]
pub fn timestamp_label() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    format!("{secs}")
}

/// 把 `log` 记录转发到浏览器控制台。
pub struct ConsoleLogger {
    level: LevelFilter,
}

impl ConsoleLogger {
    fn write(&self, level: Level, message: &str) {
        #[cfg(target_arch = "wasm32")]
        {
            let value = wasm_bindgen::JsValue::from_str(message);
            match level {
                Level::Error => web_sys::console::error_1(&value),
                Level::Warn => web_sys::console::warn_1(&value),
                Level::Info => web_sys::console::info_1(&value),
                Level::Debug | Level::Trace => web_sys::console::log_1(&value),
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (level, message);
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}: {}", record.level(), record.target(), record.args());
            self.write(record.level(), &message);
        }
    }

    fn flush(&self) {}
}

static LOGGER: OnceCell<ConsoleLogger> = OnceCell::new();

/// 安装控制台日志，只有第一次调用生效；返回实际生效的级别。
pub fn init_logging(level: LevelFilter) -> LevelFilter {
    let logger = LOGGER.get_or_init(|| ConsoleLogger { level });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(logger.level);
    }
    logger.level
}

pub fn parse_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {}
