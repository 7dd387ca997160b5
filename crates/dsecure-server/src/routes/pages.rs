//! HTML page routes.
//!
//! Serves the landing page at `/`, the news listing at `/news`, and article
//! pages at `/blog/{slug}`. Article pages embed the reaction widget with the
//! visitor's current counts already rendered; a small inline script posts
//! clicks to the reaction API and updates the buttons in place. Comments and
//! the enquiry form are mount points for external widgets.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};

use dsecure_core::content::{self, Article};
use dsecure_core::reaction::{Reaction, ReactionRecord};

use crate::error::AppError;
use crate::middleware::Visitor;
use crate::state::AppState;

/// Build the page router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(landing_page))
        .route("/news", get(news_page))
        .route("/blog/{slug}", get(article_page))
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn landing_page() -> Html<String> {
    let mut body = String::with_capacity(2048);
    body.push_str(
        r#"<section class="hero">
  <h1>Certified data erasure for every drive you retire</h1>
  <p>D-Secure wipes HDDs, SSDs, and mobile devices to NIST 800-88 and issues a tamper-proof certificate for each one.</p>
  <a class="btn" href="/news">Read the latest articles</a>
</section>
<section class="latest"><h2>Latest</h2><ul>"#,
    );
    for article in content::articles().into_iter().take(3) {
        let _ = write!(
            body,
            r#"<li><a href="{}">{}</a></li>"#,
            article.path(),
            escape_html(article.title)
        );
    }
    body.push_str("</ul></section>");

    Html(layout(
        "D-Secure | Data Erasure & ITAD",
        "Certified data erasure software for IT asset disposition.",
        &["data erasure", "ITAD", "D-Secure"],
        &body,
    ))
}

async fn news_page() -> Html<String> {
    let mut body = String::with_capacity(4096);
    body.push_str(r#"<section class="news"><h1>News &amp; Articles</h1>"#);
    for entry in content::news() {
        let _ = write!(
            body,
            r#"<article class="news-card"><span class="tag">{category}</span><time datetime="{date}">{date}</time><h2><a href="/blog/{slug}">{title}</a></h2><p>{summary}</p></article>"#,
            category = escape_html(entry.category),
            date = entry.published,
            slug = entry.slug,
            title = escape_html(entry.title),
            summary = escape_html(entry.summary),
        );
    }
    body.push_str("</section>");

    Html(layout(
        "News | D-Secure",
        "News and articles on data erasure, ITAD, and compliance.",
        &["data erasure news", "ITAD", "compliance"],
        &body,
    ))
}

async fn article_page(
    State(state): State<Arc<AppState>>,
    Extension(visitor): Extension<Visitor>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let Some(article) = content::find(&slug) else {
        return Ok(not_found_page().into_response());
    };

    let record = state
        .reactions
        .scoped(&visitor.scope())
        .initialize(article.slug)
        .await?;

    Ok(Html(render_article(article, &record)).into_response())
}

/// The 404 page for unknown HTML routes and article slugs.
pub fn not_found_page() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(layout(
            "Not found | D-Secure",
            "Page not found.",
            &[],
            r#"<section class="hero"><h1>Page not found</h1><a class="btn" href="/news">Back to news</a></section>"#,
        )),
    )
}

// ── Rendering ────────────────────────────────────────────────────────

fn render_article(article: &Article, record: &ReactionRecord) -> String {
    let mut body = String::with_capacity(4096);
    let _ = write!(
        body,
        r#"<article class="post"><span class="tag">{}</span><h1>{}</h1><time datetime="{date}">{date}</time>"#,
        escape_html(article.category),
        escape_html(article.title),
        date = article.published,
    );
    for paragraph in article.paragraphs {
        let _ = write!(body, "<p>{}</p>", escape_html(paragraph));
    }
    body.push_str(&reaction_widget(record));
    let _ = write!(
        body,
        r#"<div class="comments" data-item-id="{slug}"></div><div class="enquiry" data-item-id="{slug}" data-title="{title}"></div></article>"#,
        slug = article.slug,
        title = escape_html(article.title),
    );

    layout(
        &format!("{} | D-Secure", article.title),
        article.summary,
        article.keywords,
        &body,
    )
}

/// The like/dislike buttons for one item, pre-filled from `record`.
fn reaction_widget(record: &ReactionRecord) -> String {
    let pressed = |r: Reaction| if record.reaction == r { "true" } else { "false" };
    format!(
        r#"<div class="reactions" data-item-id="{id}"><button type="button" class="react" data-action="like" aria-pressed="{liked}">&#128077; <span>{likes}</span></button><button type="button" class="react" data-action="dislike" aria-pressed="{disliked}">&#128078; <span>{dislikes}</span></button></div>{script}"#,
        id = escape_html(&record.item_id),
        liked = pressed(Reaction::Liked),
        disliked = pressed(Reaction::Disliked),
        likes = escape_html(&record.like_label()),
        dislikes = escape_html(&record.dislike_label()),
        script = REACTION_SCRIPT,
    )
}

fn layout(title: &str, description: &str, keywords: &[&str], body: &str) -> String {
    let mut html = String::with_capacity(PAGE_CSS.len() + body.len() + 1024);
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en"><head><meta charset="utf-8"/><meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>{}</title><meta name="description" content="{}"/><meta name="keywords" content="{}"/>"#,
        escape_html(title),
        escape_html(description),
        escape_html(&keywords.join(", ")),
    );
    html.push_str(PAGE_CSS);
    html.push_str(NAV);
    html.push_str("<main>");
    html.push_str(body);
    html.push_str("</main>");
    html.push_str(FOOTER);
    html
}

/// Escape text for HTML element content and double-quoted attributes.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PAGE_CSS: &str = r"<style>
*,*::before,*::after{box-sizing:border-box;margin:0;padding:0}
:root{--bg:#0B1B2B;--text:#E8F1F8;--muted:#8FA6BA;--primary:#1FB6A6;--card:rgba(255,255,255,.04);--border:rgba(255,255,255,.08)}
body{font-family:-apple-system,'Segoe UI',sans-serif;background:var(--bg);color:var(--text);line-height:1.65}
a{color:inherit;text-decoration:none}
.nav{display:flex;justify-content:space-between;align-items:center;max-width:1000px;margin:0 auto;padding:24px}
.nav-logo{font-weight:800;font-size:20px}.nav-links a{color:var(--muted);margin-left:20px;font-weight:600}
main{max-width:820px;margin:0 auto;padding:40px 24px 80px}
.hero{text-align:center;padding:60px 0}.hero h1{font-size:44px;line-height:1.1;margin-bottom:20px}.hero p{color:var(--muted);margin-bottom:32px}
.btn{display:inline-block;padding:12px 28px;border-radius:50px;background:var(--primary);color:#04201D;font-weight:700}
.tag{font-size:12px;text-transform:uppercase;letter-spacing:1px;color:var(--primary);margin-right:12px}
time{font-size:13px;color:var(--muted)}
.news-card{background:var(--card);border:1px solid var(--border);border-radius:16px;padding:24px;margin:18px 0}
.news-card h2{font-size:20px;margin:8px 0}.news-card p{color:var(--muted)}
.post h1{font-size:36px;line-height:1.15;margin:12px 0}.post p{margin:18px 0}
.reactions{display:flex;gap:12px;margin:36px 0}
.react{background:var(--card);color:var(--text);border:1px solid var(--border);border-radius:50px;padding:8px 18px;font-size:15px;cursor:pointer}
.react[aria-pressed=true]{border-color:var(--primary);color:var(--primary)}
.footer{border-top:1px solid var(--border);max-width:1000px;margin:0 auto;padding:24px;font-size:13px;color:var(--muted)}
</style></head>
";

const NAV: &str = r#"<body>
<nav class="nav"><a class="nav-logo" href="/">D-Secure</a><div class="nav-links"><a href="/news">News</a><a href="/#contact">Contact</a></div></nav>
"#;

const FOOTER: &str = r#"<footer class="footer">&copy; D-Secure Tech. Certified data erasure &amp; ITAD.</footer>
</body></html>
"#;

/// Posts reaction clicks and redraws both buttons from a successful response.
/// Error responses leave the buttons as they were.
const REACTION_SCRIPT: &str = r"<script>
document.querySelectorAll('.reactions').forEach(function(w){
  w.querySelectorAll('.react').forEach(function(b){
    b.addEventListener('click',function(){
      fetch('/v1/reactions/'+w.dataset.itemId+'/'+b.dataset.action,{method:'POST',credentials:'same-origin'})
        .then(function(r){return r.ok?r.json():null;})
        .then(function(d){
          if(!d){return;}
          var like=w.querySelector('[data-action=like]'),dislike=w.querySelector('[data-action=dislike]');
          like.querySelector('span').textContent=d.like_label;
          dislike.querySelector('span').textContent=d.dislike_label;
          like.setAttribute('aria-pressed',d.reaction==='liked');
          dislike.setAttribute('aria-pressed',d.reaction==='disliked');
        })
        .catch(function(){});
    });
  });
});
</script>";
