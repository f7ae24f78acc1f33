// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Course catalog: per-weekday listing replies merged into one table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One teaching arrangement of a section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Arrangement {
    /// Instructor name.
    pub jgxm: String,
    /// Weeks the section runs, e.g. `1-16`.
    pub kkzc: String,
    /// Weekday, `1` (Monday) through `7`.
    pub xq: String,
    /// Period label.
    pub skjcmc: String,
    /// Classroom.
    pub jsmc: String,
    #[serde(rename = "skzcList")]
    pub skzc_list: Vec<String>,
}

/// One selectable section as the registrar lists it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Course {
    /// Course number, shared by all sections of a course.
    pub kch: String,
    pub kcmc: String,
    /// Credits. Numeric on most deployments, a string on some.
    pub xf: serde_json::Value,
    pub skls: String,
    pub sksj: String,
    pub skdd: String,
    pub xqmc: String,
    /// Remaining seats.
    pub syrs: String,
    /// Section id used to enroll.
    pub jx0404id: String,
    pub szkcflmc: String,
    #[serde(rename = "kkapList")]
    pub kkap_list: Vec<Arrangement>,
    pub fzmc: String,
}

impl Course {
    fn first_arrangement(&self) -> Option<&Arrangement> {
        self.kkap_list.first()
    }

    pub fn instructor(&self) -> &str {
        match self.first_arrangement() {
            Some(a) if !a.jgxm.is_empty() => &a.jgxm,
            _ => &self.skls,
        }
    }

    pub fn classroom(&self) -> &str {
        match self.first_arrangement() {
            Some(a) if !a.jsmc.is_empty() => &a.jsmc,
            _ => &self.skdd,
        }
    }

    /// Listed time, or one built from the first arrangement.
    pub fn schedule(&self) -> String {
        if !self.sksj.is_empty() {
            return self.sksj.clone();
        }
        match self.first_arrangement() {
            Some(a) => format!("{} {} {}", a.kkzc, weekday_name(&a.xq), a.skjcmc),
            None => String::new(),
        }
    }

    /// Remaining seats, with zero shown as full.
    pub fn remaining(&self) -> &str {
        if self.syrs == "0" {
            "满"
        } else {
            &self.syrs
        }
    }

    pub fn credit(&self) -> String {
        match &self.xf {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

pub fn weekday_name(day: &str) -> &'static str {
    match day {
        "1" => "星期一",
        "2" => "星期二",
        "3" => "星期三",
        "4" => "星期四",
        "5" => "星期五",
        "6" => "星期六",
        "7" => "星期日",
        _ => "",
    }
}

#[derive(Debug, Deserialize)]
struct ListingReply {
    #[serde(rename = "aaData", default)]
    aa_data: Vec<Course>,
}

/// Why one weekday's listing could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayError {
    /// Markup instead of JSON: the session is not valid for listing.
    SessionExpired,
    Status(u16),
    Parse(String),
    Transport(String),
}

impl std::fmt::Display for DayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionExpired => f.write_str("markup reply, session expired"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Parse(e) => write!(f, "unreadable reply: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

impl std::error::Error for DayError {}

/// Decode one weekday's listing body.
pub fn parse_listing(body: &str) -> Result<Vec<Course>, DayError> {
    if body.contains("<html") {
        return Err(DayError::SessionExpired);
    }
    let reply: ListingReply =
        serde_json::from_str(body).map_err(|e| DayError::Parse(e.to_string()))?;
    Ok(reply.aa_data)
}

/// Sections offered in the chosen window, unique by section id, grouped by
/// course number in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    groups: Vec<(String, Vec<Course>)>,
    index: HashMap<String, (usize, usize)>,
}

impl Catalog {
    /// Merge weekday listings. Fails when every day failed or no section
    /// was listed at all; partial failures are returned for reporting.
    pub fn merge(
        days: Vec<(u8, Result<Vec<Course>, DayError>)>,
    ) -> anyhow::Result<(Self, Vec<(u8, DayError)>)> {
        let total = days.len();
        let mut catalog = Self::default();
        let mut failures = Vec::new();
        let mut group_of: HashMap<String, usize> = HashMap::new();

        for (day, result) in days {
            let courses = match result {
                Ok(courses) => courses,
                Err(e) => {
                    failures.push((day, e));
                    continue;
                }
            };
            for course in courses {
                if course.jx0404id.is_empty() || catalog.index.contains_key(&course.jx0404id) {
                    continue;
                }
                let g = *group_of.entry(course.kch.clone()).or_insert_with(|| {
                    catalog.groups.push((course.kch.clone(), Vec::new()));
                    catalog.groups.len() - 1
                });
                let sections = &mut catalog.groups[g].1;
                catalog.index.insert(course.jx0404id.clone(), (g, sections.len()));
                sections.push(course);
            }
        }

        if total > 0 && failures.len() == total {
            let detail: Vec<String> =
                failures.iter().map(|(day, e)| format!("day {day}: {e}")).collect();
            anyhow::bail!("course listing failed for every day: {}", detail.join("; "));
        }
        if catalog.is_empty() {
            anyhow::bail!("no courses are offered in this window");
        }
        Ok((catalog, failures))
    }

    pub fn get(&self, section_id: &str) -> Option<&Course> {
        let &(g, i) = self.index.get(section_id)?;
        self.groups.get(g).and_then(|(_, sections)| sections.get(i))
    }

    pub fn contains(&self, section_id: &str) -> bool {
        self.index.contains_key(section_id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Course number and its sections, in first-seen order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[Course])> {
        self.groups.iter().map(|(kch, sections)| (kch.as_str(), sections.as_slice()))
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
