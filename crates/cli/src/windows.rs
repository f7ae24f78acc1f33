// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-window discovery from the registrar's window list page.
//!
//! The page is server-rendered HTML. Windows are read from the list table
//! when it is present; otherwise every entry link on the page is scanned.

use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;

/// Placeholder term for windows found outside the list table.
pub const UNKNOWN_TERM: &str = "当前学期";
/// Placeholder time for windows found outside the list table.
pub const UNKNOWN_TIME: &str = "当前时间";

/// One enrollment window the account can enter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionWindow {
    pub term: String,
    pub name: String,
    pub time: String,
    /// Entry URL, usually origin-relative, already rewritten to the
    /// selection index page.
    pub url: String,
}

/// Compiled patterns for the window list page.
pub struct WindowParser {
    table: Regex,
    row: Regex,
    cell: Regex,
    link: Regex,
    comment: Regex,
    tag: Regex,
    range: Regex,
    date: Regex,
}

impl WindowParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            table: Regex::new(
                r#"<table[^>]*(?:id=["']?tbKxkc["']?|class=["']?Nsb_r_list Nsb_table["']?)[^>]*>(?s:.*?)</table>"#,
            )?,
            row: Regex::new(r"<tr>[\s\S]*?</tr>")?,
            cell: Regex::new(r"<td[^>]*>([\s\S]*?)</td>")?,
            link: Regex::new(r#"<a[^>]*href=["']([^"']*)["'][^>]*>([\s\S]*?)</a>"#)?,
            comment: Regex::new(r"<!--[\s\S]*?-->")?,
            tag: Regex::new(r"<[^>]*>")?,
            range: Regex::new(r"\d{4}-\d{2}-\d{2}.*?~.*?\d{4}-\d{2}-\d{2}")?,
            date: Regex::new(r"\d{4}-\d{2}-\d{2}")?,
        })
    }

    /// Extract windows from the page, deduplicated by URL in page order.
    pub fn parse(&self, html: &str) -> Vec<SessionWindow> {
        let mut windows = self.from_table(html);
        if windows.is_empty() {
            windows = self.from_links(html);
        }

        let mut seen = HashSet::new();
        windows.retain(|w| seen.insert(w.url.clone()));
        windows
    }

    fn from_table(&self, html: &str) -> Vec<SessionWindow> {
        let Some(table) = self.table.find(html) else {
            return Vec::new();
        };

        let mut windows = Vec::new();
        for row in self.row.find_iter(table.as_str()) {
            let row = row.as_str();
            if row.contains("<th") || row.contains("background-color:#D1E4F8") {
                continue;
            }
            let Some(meta) = self.row_meta(row) else {
                continue;
            };
            let cleaned = self.comment.replace_all(row, "");
            let cells = self.cells(&cleaned);
            let Some(ops) = cells.last() else {
                continue;
            };
            for link in self.link.captures_iter(ops) {
                windows.push(SessionWindow {
                    term: meta.0.clone(),
                    name: meta.1.clone(),
                    time: meta.2.clone(),
                    url: rewrite_entry_url(&link[1]),
                });
            }
        }
        windows
    }

    fn from_links(&self, html: &str) -> Vec<SessionWindow> {
        let mut windows = Vec::new();
        for link in self.link.captures_iter(html) {
            let (href, text) = (&link[1], &link[2]);
            let is_entry = (href.contains("xsxk") || href.contains("xklc"))
                && (text.contains("选课") || text.contains("进入"));
            if !is_entry {
                continue;
            }

            let (term, name, time) = self
                .enclosing_row(html, href)
                .and_then(|row| self.row_meta(row))
                .unwrap_or_else(|| {
                    (UNKNOWN_TERM.to_owned(), self.text(text), UNKNOWN_TIME.to_owned())
                });
            windows.push(SessionWindow { term, name, time, url: rewrite_entry_url(href) });
        }
        windows
    }

    /// Term, name and time from a row with at least three cells.
    fn row_meta(&self, row: &str) -> Option<(String, String, String)> {
        let cleaned = self.comment.replace_all(row, "");
        let cells = self.cells(&cleaned);
        if cells.len() < 3 {
            return None;
        }

        let mut time = self.text(cells[2]);
        if time.is_empty() {
            time = cells
                .iter()
                .find_map(|c| self.range.find(c).map(|m| self.text(m.as_str())))
                .or_else(|| cells.iter().find(|c| self.date.is_match(c)).map(|c| self.text(c)))
                .unwrap_or_default();
        }
        Some((self.text(cells[0]), self.text(cells[1]), time))
    }

    fn enclosing_row<'h>(&self, html: &'h str, href: &str) -> Option<&'h str> {
        self.row.find_iter(html).map(|m| m.as_str()).find(|row| row.contains(href))
    }

    fn cells<'r>(&self, row: &'r str) -> Vec<&'r str> {
        self.cell
            .captures_iter(row)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    }

    fn text(&self, fragment: &str) -> String {
        self.tag.replace_all(fragment, "").trim().to_owned()
    }
}

/// Point window links at the selection index page. Only URLs that carry a
/// query are rewritten.
pub fn rewrite_entry_url(href: &str) -> String {
    let Some((path, query)) = href.split_once('?') else {
        return href.to_owned();
    };
    let path = if path.contains("xklc_view") {
        path.replacen("xklc_view", "yxxsxk_index", 1)
    } else if path.contains("xsxk_index") && !path.contains("yxxsxk_index") {
        path.replacen("xsxk_index", "yxxsxk_index", 1)
    } else {
        return href.to_owned();
    };
    format!("{path}?{query}")
}

#[cfg(test)]
#[path = "windows_tests.rs"]
mod tests;
