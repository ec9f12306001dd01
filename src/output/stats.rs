//! Tabular statistics for weighed pages
//!
//! Every page prints as one line followed by its components: the document
//! fetch, the parse step, then the assets with the slowest first.

use crate::page::Page;
use crate::resource::Resource;
use crate::trace::ConnTrace;
use std::io::{self, Write};
use std::time::Duration;

/// Width of the URL column
pub const URL_LENGTH: usize = 50;

/// Width of the host column of the connection trace
const HOST_LENGTH: usize = 60;

/// Indentation of component lines
const COMPONENT_INDENT: usize = 4;

/// One line of the report, with the lines nested under it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stat {
    pub url: String,
    pub time_taken: Duration,
    pub num_requests: usize,
    pub size: usize,
    pub components: Vec<Stat>,
}

impl Stat {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Builds the statistics of a resolved page
    ///
    /// With `slowest_only`, only the slowest asset is listed; the page line
    /// still counts all of them.
    pub fn for_page(page: &Page, slowest_only: bool) -> Self {
        let document = page.document();
        let mut stat = Stat {
            url: page.address().to_string(),
            time_taken: page.resolve_duration(),
            num_requests: 1 + page.num_assets(),
            size: page.total_bytes(),
            components: Vec::new(),
        };

        stat.add_component(Stat {
            url: document.url.clone(),
            time_taken: document.time_taken,
            num_requests: 1,
            size: document.size,
            components: Vec::new(),
        });
        stat.add_component(Stat {
            url: "parse".to_string(),
            time_taken: page.parse_duration(),
            ..Stat::default()
        });

        if slowest_only {
            stat.components.extend(page.slowest_asset().map(Stat::for_asset));
        } else {
            let mut assets: Vec<Stat> = page.asset_resources().map(Stat::for_asset).collect();
            assets.sort_by(|a, b| b.time_taken.cmp(&a.time_taken));
            stat.components.extend(assets);
        }

        if let Some(e) = page.error() {
            stat.add_component(Stat::new(format!("error: {}", e)));
        }
        stat
    }

    fn for_asset(asset: &Resource) -> Self {
        Stat {
            url: asset.url.clone(),
            time_taken: asset.time_taken,
            num_requests: 1,
            size: asset.size,
            components: Vec::new(),
        }
    }

    pub fn add_component(&mut self, component: Stat) {
        self.components.push(component);
    }

    /// Folds a page into a totals line
    ///
    /// Concurrent pages overlap, so their time is the longest one rather than
    /// the sum.
    pub fn add_to_total(&mut self, other: &Stat, concurrent: bool) {
        self.num_requests += other.num_requests;
        self.size += other.size;
        if concurrent {
            self.time_taken = self.time_taken.max(other.time_taken);
        } else {
            self.time_taken += other.time_taken;
        }
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_line(w, 0, self)?;
        for component in &self.components {
            write_line(w, COMPONENT_INDENT, component)?;
        }
        Ok(())
    }
}

fn write_line<W: Write>(w: &mut W, indent: usize, stat: &Stat) -> io::Result<()> {
    let width = URL_LENGTH - indent;
    writeln!(
        w,
        "{:indent$}{:<width$}, {:>6}, {:>13}, {:?}",
        "",
        string_max_len(width, &stat.url),
        stat.num_requests,
        stat.size,
        round_to_millis(stat.time_taken),
    )
}

fn round_to_millis(d: Duration) -> Duration {
    Duration::from_millis(((d.as_micros() + 500) / 1000) as u64)
}

/// Shortens `s` to `length` characters by replacing its middle with `...`
pub fn string_max_len(length: usize, s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < length {
        return s.to_string();
    }

    let mut prefix = (length / 2).saturating_sub(2);
    let suffix = (length / 2).saturating_sub(1);
    if length % 2 == 1 {
        prefix += 1;
    }

    let head: String = chars[..prefix].iter().collect();
    let tail: String = chars[chars.len() - suffix..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn write_stats_header<W: Write>(w: &mut W) -> io::Result<()> {
    writeln!(
        w,
        "{:<width$}, {:>6}, {:>13}, {}",
        "URL",
        "# res",
        "size (bytes)",
        "time taken",
        width = URL_LENGTH
    )
}

/// Writes the header, every page, and the totals line
pub fn write_report<W: Write>(
    w: &mut W,
    pages: &[Page],
    concurrent: bool,
    slowest_only: bool,
) -> io::Result<()> {
    let mut total = Stat::new("Total");
    write_stats_header(w)?;
    writeln!(w)?;
    for page in pages {
        let stat = Stat::for_page(page, slowest_only);
        total.add_to_total(&stat, concurrent);
        stat.write(w)?;
        writeln!(w)?;
    }
    total.write(w)
}

/// Writes the connection count of every traced host
pub fn write_conn_trace<W: Write>(w: &mut W, trace: &ConnTrace) -> io::Result<()> {
    writeln!(w, "{:<width$}, {:>6}", "host", "# conn", width = HOST_LENGTH)?;
    for (host, connections) in trace.iter() {
        writeln!(w, "{:<width$}, {:>6}", host, connections, width = HOST_LENGTH)?;
    }
    Ok(())
}
