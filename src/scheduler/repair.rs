//! 模型输出的 JSON 边界提取与截断修复
//!
//! 生成器经常把 JSON 包在散文或 markdown 代码围栏里，偶尔还会在
//! Token 上限处截断。这里做两件事：
//! 1. 取首个 `{` 到末个 `}` 的切片（丢掉两侧杂质）；
//! 2. 括号不配平时按行累积并跟踪深度，最后补齐缺失的右括号。
//!
//! 前置条件：raw 是生成器的原始文本。后置条件：返回的字符串以 `{`
//! 开头、括号深度为零；能否真正解析由调用方的 serde 决定（比如在
//! 字符串字面量中途截断的输出补括号后仍然解析失败）。
//!
//! 深度统计是朴素的，不感知字符串内的花括号；对本系统约定的
//! `{"events":[...]}` / `{"delete_events":[...]}` 负载足够。

/// 从原始模型输出中提取（必要时修复出）一段候选 JSON 对象文本
pub fn extract_json_object(raw: &str) -> Option<String> {
    let start = raw.find('{')?;

    if let Some(end) = raw.rfind('}') {
        if end > start {
            let slice = &raw[start..=end];
            if net_depth(slice) == 0 {
                return Some(slice.to_string());
            }
        }
    }

    repair_truncated(&raw[start..])
}

/// 整段文本的净括号深度
fn net_depth(text: &str) -> i32 {
    let mut depth = 0;
    for ch in text.chars() {
        match ch {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// 逐行累积直到深度归零；行耗尽仍未归零则补齐右括号
fn repair_truncated(tail: &str) -> Option<String> {
    let mut depth = 0i32;
    let mut collected = String::new();

    for line in tail.lines() {
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
        collected.push_str(line);
        collected.push('\n');

        if depth == 0 {
            return Some(collected.trim().to_string());
        }
        if depth < 0 {
            return None;
        }
    }

    if depth > 0 {
        let mut repaired = collected.trim_end().to_string();
        repaired.push_str(&"}".repeat(depth as usize));
        return Some(repaired);
    }
    None
}
