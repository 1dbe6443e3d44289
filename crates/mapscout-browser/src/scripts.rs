//! In-page scripts run through CDP. Builders are pure so the generated
//! source can be checked without a browser.

/// Request patterns blocked for every run: analytics, logging beacons,
/// favourites sync, fonts, stylesheets and map tiles.
pub const BLOCKED_URLS: [&str; 7] = [
    "*google-analytics*",
    "*/_/log*",
    "*/_/metrics*",
    "*/favorites.api*",
    "*/fonts/*",
    "*/styles/*",
    "*/tile*.maps*",
];

/// Launch flags that keep the browser lean.
pub const LAUNCH_ARGS: [&str; 6] = [
    "--disable-extensions",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--blink-settings=imagesEnabled=false",
    "--disable-infobars",
    "--disable-notifications",
];

/// Attribute used to hand a text-search hit back to the element finder.
pub const TEXT_HIT_ATTR: &str = "data-mapscout-hit";

pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

pub const GO_BACK: &str = "history.back()";

pub const GC_HINT: &str = "if (window.gc) { window.gc(); }";

pub const CLEAR_STORAGE: &str = "localStorage.clear(); sessionStorage.clear();";

fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Function declaration, called on a star container, that counts vector
/// markers whose fill colour contains any of `colors`.
#[must_use]
pub fn filled_marker_fn(selector: &str, colors: &[String]) -> String {
    format!(
        "function() {{ \
           const colors = {colors}; \
           let n = 0; \
           for (const el of this.querySelectorAll({selector})) {{ \
             const fill = (el.getAttribute('fill') || getComputedStyle(el).fill || '').toLowerCase(); \
             if (colors.some(c => fill.includes(c.toLowerCase()))) n++; \
           }} \
           return n; \
         }}",
        colors = js_literal(colors),
        selector = js_literal(selector),
    )
}

/// Expression that tags the first visible button or link whose lower-cased
/// text contains a needle with [`TEXT_HIT_ATTR`]. Evaluates to `true` on a
/// hit.
#[must_use]
pub fn tag_text_hit(needles: &[&str]) -> String {
    let needles: Vec<String> = needles.iter().map(|n| n.to_lowercase()).collect();
    format!(
        "(() => {{ \
           document.querySelectorAll('[{attr}]').forEach(el => el.removeAttribute('{attr}')); \
           const needles = {needles}; \
           for (const el of document.querySelectorAll('button, a, [role=\"button\"]')) {{ \
             if (el.offsetParent === null) continue; \
             const text = (el.innerText || '').toLowerCase(); \
             if (needles.some(n => text.includes(n))) {{ \
               el.setAttribute('{attr}', '1'); \
               return true; \
             }} \
           }} \
           return false; \
         }})()",
        attr = TEXT_HIT_ATTR,
        needles = js_literal(&needles),
    )
}

/// CSS selector matching the element tagged by [`tag_text_hit`].
#[must_use]
pub fn text_hit_selector() -> String {
    format!("[{TEXT_HIT_ATTR}]")
}
