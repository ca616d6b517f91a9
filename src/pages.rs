//! Server-rendered HTML. Every user-supplied string goes through [`escape`].

use std::fmt::Write;

use crate::{
    config::Theme,
    constants::LOAD_FAILED_MESSAGE,
    models::quotes::{Quote, TextDirection},
    presentation::Presentation,
    submission::{Step, SubmissionFlow},
    wall::{format::count_label, RenderState, WallEntry},
};

const STYLE: &str = r#"
*{box-sizing:border-box}
body{margin:0;min-height:100vh;font-family:system-ui,sans-serif;color:#111827;overflow-x:hidden}
.backdrop{position:fixed;inset:0;z-index:-2}
.overlay{position:fixed;inset:0;z-index:-1}
.floating{position:fixed;inset:0;pointer-events:none;overflow:hidden;z-index:0}
.bubble{position:fixed;left:0;top:0;transform:translateX(-50%);border-radius:1.5rem;padding:1rem 1.25rem;border:2px solid rgba(255,255,255,.3);color:#fff;backdrop-filter:blur(20px);box-shadow:0 8px 32px rgba(0,0,0,.5);opacity:0}
.bubble.small{width:240px}.bubble.medium{width:290px}.bubble.large{width:340px}
.bubble .by{font-style:italic;font-size:.85em;margin-top:.5rem;opacity:.9}
main{position:relative;z-index:1;max-width:40rem;margin:0 auto;padding:4rem 1rem}
.card{background:rgba(255,255,255,.85);border-radius:1.5rem;padding:2rem;box-shadow:0 8px 32px rgba(0,0,0,.1)}
.error{color:#b91c1c}
.banner{background:#fee2e2;color:#991b1b;padding:.75rem 1rem;border-radius:.75rem;margin-bottom:1rem}
.quote{background:#fff;border-radius:1rem;padding:1rem;margin:.75rem 0}
.quote .meta{font-size:.8em;color:#6b7280;margin-top:.5rem}
.nav{display:flex;justify-content:space-between;gap:1rem;margin-bottom:1rem}
.pill{display:inline-block;padding:.5rem 1rem;border-radius:999px;background:#fff;color:#2563eb;text-decoration:none}
.pill.primary{background:#2563eb;color:#fff}
@media (max-width:767px){.desktop-only{display:none}}
.slide{position:fixed;inset:0;display:flex;align-items:center;justify-content:center;flex-direction:column;color:#fff;text-align:center;padding:4rem}
.slide blockquote{font-size:clamp(1.5rem,4vw,3.5rem);margin:0 0 2rem}
"#;

const FLOATING_SCRIPT: &str = r#"
(function () {
  const layer = document.getElementById('floating');
  if (!layer) return;
  async function draw() {
    let data;
    try {
      const res = await fetch('/floating?width=' + Math.round(window.innerWidth));
      if (!res.ok) return;
      data = await res.json();
    } catch (e) { return; }
    layer.replaceChildren();
    for (const b of data.bubbles) {
      const el = document.createElement('div');
      el.className = 'bubble ' + b.size;
      el.style.background = data.bubble_color;
      el.style.zIndex = b.z_index;
      const text = document.createElement('p');
      text.dir = b.quote_direction;
      text.textContent = b.quote;
      const by = document.createElement('p');
      by.className = 'by';
      by.dir = b.name_direction;
      by.textContent = b.full_name;
      el.append(text, by);
      layer.append(el);
      el.animate(b.animation.keyframes.map(k => ({
        offset: k.at, opacity: k.opacity,
        transform: 'translate(calc(' + k.x_vw + 'vw - 50%), ' + k.y_vh + 'vh)'
      })), {
        duration: b.animation.duration_secs * 1000,
        delay: b.animation.delay_secs * 1000,
        iterations: b.animation.repeat ? Infinity : 1,
        easing: 'cubic-bezier(0.4, 0, 0.2, 1)', fill: 'both'
      });
    }
  }
  draw();
  setInterval(draw, Number(layer.dataset.interval) * 1000);
})();
"#;

const WALL_SCRIPT: &str = r#"
(function () {
  const list = document.getElementById('quotes');
  const count = document.getElementById('count');
  const banner = document.getElementById('banner');
  const events = new EventSource('/wall/events');
  events.addEventListener('snapshot', (e) => {
    const update = JSON.parse(e.data);
    count.textContent = update.count_label;
    banner.hidden = true;
    list.replaceChildren();
    if (update.quotes.length === 0) {
      const empty = document.createElement('p');
      empty.textContent = 'No quotes yet. Be the first to share your thoughts!';
      list.append(empty);
    }
    for (const q of update.quotes) {
      const item = document.createElement('div');
      item.className = 'quote';
      const text = document.createElement('p');
      text.dir = q.quote_direction;
      text.textContent = q.quote;
      const meta = document.createElement('p');
      meta.className = 'meta';
      const name = document.createElement('span');
      name.dir = q.name_direction;
      name.textContent = q.full_name;
      meta.append(name, ' · ' + q.time_label);
      item.append(text, meta);
      list.append(item);
    }
  });
  events.addEventListener('failure', (e) => {
    banner.textContent = e.data;
    banner.hidden = false;
  });
  events.addEventListener('error', () => {
    banner.textContent = banner.dataset.failed;
    banner.hidden = false;
  });
})();
"#;

const FORM_SCRIPT: &str = r#"
(function () {
  const form = document.getElementById('share-form');
  if (!form) return;
  form.addEventListener('submit', (e) => {
    const share = e.submitter;
    if (!share || share.value !== 'share') return;
    const action = document.createElement('input');
    action.type = 'hidden';
    action.name = 'action';
    action.value = 'share';
    form.append(action);
    share.disabled = true;
    share.textContent = 'Sharing...';
  });
})();
"#;

const PRESENTATION_SCRIPT: &str = r#"
document.addEventListener('keydown', (e) => {
  const target = { ArrowRight: 'next', ArrowLeft: 'prev', Escape: 'exit' }[e.key];
  if (target) document.getElementById(target).click();
});
"#;

pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }

    escaped
}

fn document(title: &str, background: &str, overlay: Option<f32>, body: &str, script: &str) -> String {
    let overlay = overlay
        .map(|opacity| {
            format!(r#"<div class="overlay" style="background:rgba(0, 0, 0, {opacity})"></div>"#)
        })
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<div class="backdrop" style="background:{background}"></div>
{overlay}
{body}
<script>{script}</script>
</body>
</html>"#,
        title = escape(title),
        background = escape(background),
    )
}

fn floating_layer(theme: &Theme, rotation_secs: u64) -> (String, Option<f32>) {
    let overlay = theme
        .background_image
        .as_ref()
        .map(|_| theme.background_overlay_opacity);

    (
        format!(r#"<div id="floating" class="floating" data-interval="{rotation_secs}"></div>"#),
        overlay,
    )
}

fn dir(text: &str) -> &'static str {
    TextDirection::of(text).as_str()
}

/// The submission form at whatever step `flow` is in.
pub fn form_page(
    flow: &SubmissionFlow,
    error: Option<&str>,
    count: usize,
    theme: &Theme,
    rotation_secs: u64,
) -> String {
    let draft = flow.draft();
    let limits = flow.limits();
    let error = error
        .map(|e| format!(r#"<p class="error" role="alert">{}</p>"#, escape(e)))
        .unwrap_or_default();

    let step = match flow.step() {
        Step::CollectingName => format!(
            r#"<h2>Welcome to the Quotes Wall</h2>
<p>Submit your best quote and see it on the live wall.</p>
<form method="post" action="/submit">
<input type="hidden" name="step" value="name">
<input type="hidden" name="quote" value="{quote}">
<input name="full_name" value="{name}" maxlength="{name_max}" placeholder="Enter your full name..." dir="{name_dir}" autofocus>
{error}
<button name="action" value="continue">Continue</button>
</form>"#,
            quote = escape(draft.quote()),
            name = escape(draft.full_name()),
            name_max = limits.name_max,
            name_dir = dir(draft.full_name()),
        ),
        Step::CollectingQuote | Step::Submitting => format!(
            r#"<h2 dir="{name_dir}">Hi, {name}!</h2>
<p>Share your quote with everyone!</p>
<form id="share-form" method="post" action="/submit">
<input type="hidden" name="step" value="quote">
<input type="hidden" name="draft" value="{draft_id}">
<input type="hidden" name="full_name" value="{name}">
<textarea name="quote" rows="5" maxlength="{quote_max}" placeholder="Type your message..." dir="{quote_dir}" autofocus>{quote}</textarea>
<p class="meta">{used}/{quote_max}</p>
{error}
<button name="action" value="back">Back</button>
<button name="action" value="share"{disabled}>{label}</button>
</form>"#,
            draft_id = flow.draft_id(),
            name = escape(draft.full_name()),
            name_dir = dir(draft.full_name()),
            quote = escape(draft.quote()),
            quote_dir = dir(draft.quote()),
            quote_max = limits.quote_max,
            used = draft.quote().chars().count(),
            disabled = if flow.is_submitting() { " disabled" } else { "" },
            label = if flow.is_submitting() { "Sharing..." } else { "Share Quote" },
        ),
        Step::Succeeded => String::from(
            r#"<h3>Quote Shared Successfully!</h3>
<p>Your quote has been added to the quotes wall.</p>
<form method="post" action="/submit">
<input type="hidden" name="step" value="done">
<button name="action" value="view" class="pill primary">View Quotes Wall</button>
</form>"#,
        ),
    };

    let badge = if count > 0 {
        format!(r#" <span id="count">{count}</span>"#)
    } else {
        String::new()
    };

    let (floating, overlay) = floating_layer(theme, rotation_secs);
    let body = format!(
        r#"{floating}
<main>
<div class="card">
{step}
<p><a class="pill" href="/wall">View Quotes Wall{badge}</a></p>
</div>
</main>"#
    );

    document(
        "Quotes Wall",
        &theme.background_css(),
        overlay,
        &body,
        &format!("{FLOATING_SCRIPT}{FORM_SCRIPT}"),
    )
}

/// The wall as it stands; the script then keeps it live over `/wall/events`.
pub fn wall_page(
    state: RenderState<'_>,
    entries: &[WallEntry],
    theme: &Theme,
    rotation_secs: u64,
) -> String {
    let mut list = String::new();
    let mut banner_text = None;
    let mut count = 0;

    match state {
        RenderState::Loading => list.push_str("<p>Loading quotes...</p>"),
        RenderState::Error { message } => {
            let _ = write!(list, r#"<p class="error">{}</p>"#, escape(message));
        }
        RenderState::Loaded { quotes, banner } => {
            count = quotes.len();
            banner_text = banner;

            if entries.is_empty() {
                list.push_str("<p>No quotes yet. Be the first to share your thoughts!</p>");
            }

            for entry in entries {
                let _ = write!(
                    list,
                    r#"<div class="quote"><p dir="{quote_dir}">{quote}</p><p class="meta"><span dir="{name_dir}">{name}</span> &middot; {time}</p></div>"#,
                    quote_dir = entry.quote_direction.as_str(),
                    quote = escape(&entry.quote),
                    name_dir = entry.name_direction.as_str(),
                    name = escape(&entry.full_name),
                    time = escape(&entry.time_label),
                );
            }
        }
    }

    let presentation_link = if count > 0 {
        r#"<a class="pill primary desktop-only" href="/presentation?index=0">Presentation Mode</a>"#
    } else {
        ""
    };

    let (floating, overlay) = floating_layer(theme, rotation_secs);
    let body = format!(
        r#"{floating}
<main>
<div class="nav"><a class="pill" href="/">&larr; Back to Form</a>{presentation_link}</div>
<div class="card">
<h2>Quotes Wall</h2>
<p id="count">{count_label}</p>
<div id="banner" class="banner" role="alert" data-failed="{failed}"{hidden}>{banner}</div>
<div id="quotes">{list}</div>
</div>
</main>"#,
        count_label = count_label(count),
        hidden = if banner_text.is_some() { "" } else { " hidden" },
        banner = escape(banner_text.unwrap_or_default()),
        failed = escape(LOAD_FAILED_MESSAGE),
    );

    document(
        "Quotes Wall",
        &theme.background_css(),
        overlay,
        &body,
        &format!("{FLOATING_SCRIPT}{WALL_SCRIPT}"),
    )
}

pub fn presentation_page(
    quote: &Quote,
    presentation: Presentation,
    total: usize,
    theme: &Theme,
) -> String {
    let mut prev = presentation;
    prev.prev(total);
    let mut next = presentation;
    next.next(total);

    let overlay = theme
        .presentation_background
        .as_ref()
        .filter(|background| !background.contains("gradient("))
        .map(|_| theme.presentation_overlay_opacity);

    let body = format!(
        r#"<div class="slide">
<a id="exit" class="pill" href="/wall" style="position:fixed;top:1rem;right:1rem">Exit</a>
<blockquote dir="{quote_dir}">{quote}</blockquote>
<p dir="{name_dir}">{name}</p>
<div class="nav">
<a id="prev" class="pill" href="/presentation?index={prev}">&larr;</a>
<span>{counter}</span>
<a id="next" class="pill" href="/presentation?index={next}">&rarr;</a>
</div>
</div>"#,
        quote_dir = dir(&quote.quote),
        quote = escape(&quote.quote),
        name_dir = dir(&quote.full_name),
        name = escape(&quote.full_name),
        prev = prev.index(),
        next = next.index(),
        counter = presentation.counter_label(total),
    );

    document(
        "Presentation Mode",
        &theme.presentation_background_css(),
        overlay,
        &body,
        PRESENTATION_SCRIPT,
    )
}
