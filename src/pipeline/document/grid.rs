//! Text-grid table detection.
//!
//! Tables are recovered from page text, not from drawing operators. A run of
//! consecutive tabular lines forms one grid. The first line decides the
//! layout: tab-separated, pipe-separated, or whitespace-aligned. For aligned
//! grids the header's segment offsets are the column starts and every later
//! row is assigned to columns by where its segments begin, so blank cells
//! survive as empty strings and rows that stop early yield `None`.

use super::types::{Cell, TableGrid};

/// Whitespace run that separates two aligned cells.
const MIN_GAP: usize = 2;

/// A grid needs a header and at least one data row.
const MIN_ROWS: usize = 2;

/// Slack (in characters) when matching a cell to a header column start.
const ALIGN_TOLERANCE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Layout {
    Tabs,
    Pipes,
    Aligned(Vec<usize>),
}

/// Detect all grids in a block of text, in reading order.
pub fn detect_grids(text: &str) -> Vec<TableGrid> {
    let mut grids = Vec::new();
    let mut open: Option<(Layout, Vec<Vec<Cell>>)> = None;

    for line in text.lines() {
        let continued = match open.as_mut() {
            Some((layout, rows)) => {
                let width = rows.first().map_or(0, Vec::len);
                match continue_row(layout, width, line) {
                    Some(row) => {
                        rows.push(row);
                        true
                    }
                    None => false,
                }
            }
            None => false,
        };
        if continued {
            continue;
        }
        close(open.take(), &mut grids);
        open = start_grid(line);
    }
    close(open, &mut grids);

    grids
}

fn close(open: Option<(Layout, Vec<Vec<Cell>>)>, grids: &mut Vec<TableGrid>) {
    if let Some((_, rows)) = open {
        if rows.len() >= MIN_ROWS {
            grids.push(TableGrid::new(rows));
        }
    }
}

/// Heuristic: a line opens a grid if it is tab-separated, has 2+ pipes, or
/// has at least two segments split by a multi-space gap.
fn is_tabular_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.contains('\t') {
        return true;
    }
    if trimmed.matches('|').count() >= 2 {
        return true;
    }
    segments(trimmed).len() >= 2
}

fn start_grid(line: &str) -> Option<(Layout, Vec<Vec<Cell>>)> {
    if !is_tabular_line(line) {
        return None;
    }
    let trimmed = line.trim();
    let (layout, header) = if trimmed.contains('\t') {
        (Layout::Tabs, split_tabs(line))
    } else if trimmed.matches('|').count() >= 2 {
        (Layout::Pipes, split_pipes(line))
    } else {
        let segs = segments(line);
        let starts = segs.iter().map(|(start, _)| *start).collect();
        let header = segs.into_iter().map(|(_, text)| Some(text)).collect();
        (Layout::Aligned(starts), header)
    };
    Some((layout, vec![header]))
}

/// The row this line contributes to an open grid, or `None` if it ends it.
fn continue_row(layout: &Layout, width: usize, line: &str) -> Option<Vec<Cell>> {
    if line.trim().is_empty() {
        return None;
    }
    let mut row = match layout {
        Layout::Tabs if line.contains('\t') => split_tabs(line),
        Layout::Pipes if line.matches('|').count() >= 2 => split_pipes(line),
        Layout::Aligned(starts) => {
            let segs = segments(line);
            // Two-column grids only continue through two-cell rows.
            let enough = if starts.len() == 2 { segs.len() == 2 } else { segs.len() >= 2 };
            if !enough {
                return None;
            }
            slice_aligned(starts, segs, line.chars().count())
        }
        _ => return None,
    };
    if row.len() < width {
        row.resize(width, None);
    }
    Some(row)
}

fn split_tabs(line: &str) -> Vec<Cell> {
    line.trim_matches(['\r', '\n'])
        .split('\t')
        .map(|c| Some(c.trim().to_string()))
        .collect()
}

fn split_pipes(line: &str) -> Vec<Cell> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| Some(c.trim().to_string())).collect()
}

/// Non-empty text segments separated by gaps of `MIN_GAP`+ whitespace, with
/// their starting character offsets. Single spaces stay inside a segment.
fn segments(line: &str) -> Vec<(usize, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let mut end = i;
        while i < chars.len() {
            if chars[i].is_whitespace() {
                let gap_start = i;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                if i - gap_start >= MIN_GAP || i == chars.len() {
                    break;
                }
            } else {
                i += 1;
                end = i;
            }
        }
        out.push((start, chars[start..end].iter().collect()));
    }

    out
}

fn slice_aligned(starts: &[usize], segs: Vec<(usize, String)>, line_len: usize) -> Vec<Cell> {
    let mut cells: Vec<Cell> = starts
        .iter()
        .map(|&start| (line_len > start).then(String::new))
        .collect();

    for (seg_start, text) in segs {
        let column = starts
            .iter()
            .rposition(|&start| start <= seg_start + ALIGN_TOLERANCE)
            .unwrap_or(0);
        match cells[column].as_mut() {
            Some(existing) if !existing.is_empty() => {
                existing.push(' ');
                existing.push_str(&text);
            }
            _ => cells[column] = Some(text),
        }
    }

    cells
}
