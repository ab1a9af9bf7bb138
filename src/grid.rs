//! Results-grid HTML parsing and pagination planning.
//!
//! Pure functions over page source. Parsing is kept synchronous and free of
//! driver state so the navigator can call it between polls without holding
//! anything across an await point.

use regex::Regex;
use scraper::{Html, Selector};

use crate::driver::{PostbackCommand, ROWS_PER_PAGE};

/// One link in the pager row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub label: PageLabel,
    /// The page number carried in the link's postback argument.
    pub argument: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLabel {
    /// A numbered link, clickable to jump straight to that page.
    Number(u32),
    /// A `...` link that reveals the next block of page numbers.
    Ellipsis,
}

/// What one parse of the results page yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSnapshot {
    /// Document rows on this page, at most [`ROWS_PER_PAGE`].
    pub row_count: usize,
    /// The page the pager marks as current, when a pager is present.
    pub current_page: Option<u32>,
    pub pager: Vec<PageLink>,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Parse the results grid out of page source. `None` when the grid is not
/// present at all, which callers treat as "results not rendered yet".
pub fn parse_grid(html: &str) -> Option<GridSnapshot> {
    let doc = Html::parse_document(html);
    doc.select(&selector("#RegistrationGrid")).next()?;

    let row_count = doc
        .select(&selector(r#"input[value="IndexII"]"#))
        .count()
        .min(ROWS_PER_PAGE);

    let current_page = doc
        .select(&selector("tr.GridPager span"))
        .filter_map(|span| span.text().collect::<String>().trim().parse().ok())
        .next();

    let arg_re = Regex::new(r"Page\$(\d+)").unwrap();
    let mut pager = Vec::new();
    for a in doc.select(&selector("tr.GridPager a")) {
        let href = a.value().attr("href").unwrap_or_default();
        let Some(caps) = arg_re.captures(href) else {
            continue;
        };
        let Ok(argument) = caps[1].parse::<u32>() else {
            continue;
        };
        let text = a.text().collect::<String>();
        let label = match text.trim() {
            "..." => PageLabel::Ellipsis,
            n => match n.parse() {
                Ok(num) => PageLabel::Number(num),
                Err(_) => continue,
            },
        };
        pager.push(PageLink { label, argument });
    }

    Some(GridSnapshot {
        row_count,
        current_page,
        pager,
    })
}

/// True when the portal rendered its empty-result banner.
pub fn no_records_banner(html: &str) -> bool {
    html.contains("No Records Found")
}

/// The portal's inline error message, when one is showing.
pub fn error_banner(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let msg = doc
        .select(&selector("span#lblMsg"))
        .next()
        .map(|span| span.text().collect::<String>().trim().to_string())?;
    if msg.is_empty() {
        None
    } else {
        Some(msg)
    }
}

/// Decide how to reach the page after `current`.
///
/// A direct numbered link wins. At a block boundary only a forward `...`
/// link exists; its argument is the first page of the next block, which is
/// exactly `current + 1`. No candidate at all means `current` is the last
/// page.
pub fn plan_next_page(current: u32, pager: &[PageLink]) -> Option<PostbackCommand> {
    let direct = pager
        .iter()
        .find(|l| l.label == PageLabel::Number(current + 1));
    if let Some(link) = direct {
        return Some(PostbackCommand::page(link.argument));
    }
    pager
        .iter()
        .find(|l| l.label == PageLabel::Ellipsis && l.argument > current)
        .map(|l| PostbackCommand::page(l.argument))
}
