// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive setup prompts. Generic over the streams so tests can script
//! the answers.

use std::collections::HashSet;
use std::io::{BufRead, Write};

use seatgrab_engine::ResourceTarget;

use crate::catalog::Catalog;
use crate::windows::SessionWindow;

/// Word that ends section entry.
pub const DONE: &str = "done";

/// Print `prompt` and read one trimmed line. `None` at end of input.
pub fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> anyhow::Result<Option<String>> {
    write!(output, "{prompt}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}

/// Account and secret, in that order.
pub fn read_account<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<(String, String)> {
    let account = ask(input, output, "请输入账号: ")?.unwrap_or_default();
    if account.is_empty() {
        anyhow::bail!("no account given");
    }
    let secret = ask(input, output, "请输入密码: ")?.unwrap_or_default();
    if secret.is_empty() {
        anyhow::bail!("no password given");
    }
    Ok((account, secret))
}

/// Ask for a window number until a valid one is entered.
pub fn choose_window<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    windows: &[SessionWindow],
) -> anyhow::Result<SessionWindow> {
    if windows.is_empty() {
        anyhow::bail!("no enrollment windows to choose from");
    }
    loop {
        let Some(answer) = ask(input, output, "\n请选择选课会话编号: ")? else {
            anyhow::bail!("input closed before a window was chosen");
        };
        let picked = answer.parse::<usize>().ok().and_then(|n| n.checked_sub(1));
        match picked.and_then(|i| windows.get(i)) {
            Some(window) => {
                writeln!(output, "已选择: {} - {}", window.term, window.name)?;
                return Ok(window.clone());
            }
            None => writeln!(output, "无效的选择，请输入 1-{} 之间的数字", windows.len())?,
        }
    }
}

/// Read section ids, one per line, until [`DONE`] or end of input. Unknown
/// and repeated ids are refused. Order of entry is kept.
pub fn choose_sections<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    catalog: &Catalog,
) -> anyhow::Result<Vec<ResourceTarget>> {
    writeln!(output, "\n请输入要选择的选课ID，每行一个，输入 '{DONE}' 结束:")?;
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    while let Some(answer) = ask(input, output, "> ")? {
        if answer == DONE {
            break;
        }
        if answer.is_empty() {
            continue;
        }
        let Some(course) = catalog.get(&answer) else {
            writeln!(output, "选课ID {answer} 不存在，请重新输入")?;
            continue;
        };
        if !seen.insert(answer.clone()) {
            writeln!(output, "选课ID {answer} 已经添加过了，请勿重复添加")?;
            continue;
        }
        writeln!(output, "已添加选课ID: {answer}")?;
        targets.push(ResourceTarget::new(answer, course.kcmc.clone()));
    }

    writeln!(output, "\n已选择 {} 门课程", targets.len())?;
    Ok(targets)
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
