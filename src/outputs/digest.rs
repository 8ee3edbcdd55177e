//! HTML digest rendering.
//!
//! Two pure functions: [`email_subject`] stamps a date into the subject line
//! and [`email_body`] turns an ordered list of posts into one HTML document.
//! Every interpolated string goes through [`escape_html`]; titles are
//! arbitrary user text.

use crate::boards::reddit::REDDIT_BASE_URL;
use crate::models::Post;
use chrono::NaiveDate;
use std::fmt::Write;

pub const SUBJECT_PREFIX: &str = "Cute Pics for";
pub const PIC_WIDTH: u32 = 400;

/// Subject line for a digest sent on `date`, e.g.
/// `Cute Pics for Friday, October 16 2026`.
pub fn email_subject(date: NaiveDate) -> String {
    format!("{SUBJECT_PREFIX} {}", date.format("%A, %B %-d %Y"))
}

/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render one post as an HTML block.
pub fn htmlize_post(post: &Post) -> String {
    let title = escape_html(&post.title);
    let board_name = escape_html(&format!("/r/{}", post.board));
    let board_url = escape_html(&format!("{REDDIT_BASE_URL}/r/{}", post.board));

    let mut block = String::new();
    // writing into a String cannot fail
    let _ = write!(
        block,
        r#"
<p>
  <p>
    <a href="{permalink}">{title}</a>
    from <a href="{board_url}">{board_name}</a>
  </p>
  <p>
    <img src="{url}" style="width:{PIC_WIDTH}px" alt="{title}">
  </p>
</p>
"#,
        permalink = escape_html(&post.permalink),
        url = escape_html(&post.url),
    );
    block
}

/// Render the full digest document for `posts`, in the order given.
pub fn email_body<'a, I>(posts: I) -> String
where
    I: IntoIterator<Item = &'a Post>,
{
    let blocks: Vec<String> = posts.into_iter().map(htmlize_post).collect();
    format!("<html>{}</html>", blocks.join("<br>"))
}
