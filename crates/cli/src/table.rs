// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text tables for the terminal.

use std::io::Write;

use seatgrab_engine::{Progress, Summary};

use crate::catalog::Catalog;
use crate::windows::SessionWindow;

const RULE_WIDTH: usize = 140;

/// Cut `s` to at most `max` characters.
fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn rule<W: Write>(out: &mut W, width: usize) -> std::io::Result<()> {
    writeln!(out, "{}", "-".repeat(width))
}

pub fn write_windows<W: Write>(out: &mut W, windows: &[SessionWindow]) -> std::io::Result<()> {
    writeln!(out, "\n可用的选课会话:")?;
    writeln!(out, "{:<4} {:<15} {:<20} {:<25}", "序号", "学年学期", "选课名称", "选课时间")?;
    rule(out, 70)?;
    for (i, w) in windows.iter().enumerate() {
        writeln!(out, "{:<4} {:<15} {:<20} {:<25}", i + 1, w.term, w.name, w.time)?;
    }
    Ok(())
}

/// Sections grouped by course number, one rule between groups.
pub fn write_catalog<W: Write>(out: &mut W, catalog: &Catalog) -> std::io::Result<()> {
    writeln!(out, "\n共获取到 {} 门可选课程:", catalog.len())?;
    writeln!(
        out,
        "{:<15} {:<20} {:<4} {:<10} {:<20} {:<20} {:<8} {:<6} {:<20} {:<10}",
        "选课ID", "课程名称", "学分", "教师", "上课时间", "上课地点", "上课校区", "剩余量", "通选课类别", "课程编号"
    )?;
    rule(out, RULE_WIDTH)?;
    for (_, sections) in catalog.groups() {
        for c in sections {
            writeln!(
                out,
                "{:<15} {:<20} {:<4} {:<10} {:<20} {:<20} {:<8} {:<6} {:<20} {:<10}",
                c.jx0404id,
                clip(&c.kcmc, 20),
                c.credit(),
                clip(c.instructor(), 10),
                clip(&c.schedule(), 20),
                clip(c.classroom(), 20),
                clip(&c.xqmc, 8),
                c.remaining(),
                clip(&c.szkcflmc, 20),
                c.kch,
            )?;
        }
        rule(out, RULE_WIDTH)?;
    }
    Ok(())
}

/// One line per worker result, printed as it happens.
pub fn write_progress<W: Write>(out: &mut W, progress: &Progress) -> std::io::Result<()> {
    match progress {
        Progress::Acquired(t) => writeln!(out, "课程 {t} 选课成功!"),
        Progress::Abandoned(a) => writeln!(out, "课程 {} 无法选择: {}", a.target, a.reason),
    }
}

pub fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> std::io::Result<()> {
    writeln!(out)?;
    if summary.cancelled {
        writeln!(out, "已停止选课")?;
    }
    if summary.acquired.is_empty() {
        writeln!(out, "没有成功选上的课程")?;
    } else {
        writeln!(out, "成功选上 {} 门课程:", summary.acquired.len())?;
        for t in &summary.acquired {
            writeln!(out, "  {:<15} {}", t.id, t.label)?;
        }
    }
    if !summary.abandoned.is_empty() {
        writeln!(out, "放弃 {} 门课程:", summary.abandoned.len())?;
        for a in &summary.abandoned {
            writeln!(out, "  {:<15} {} ({})", a.target.id, a.target.label, a.reason)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
