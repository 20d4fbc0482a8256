//! Server-rendered landing and questionnaire views.

use serde_json::json;
use uuid::Uuid;

use crate::intake::{EventSetting, EventType, MealPreference};

const STYLE: &str = r#"
body { margin: 0; background: #fffdf7; color: #2d2d2d; font-family: Georgia, serif; }
header { display: flex; justify-content: space-between; align-items: center; padding: 1.5rem 4rem; border-bottom: 1px solid #f5e6e0; }
a.button, button { border: 1px solid #2d2d2d; background: none; padding: .6rem 1.6rem; color: #2d2d2d; text-decoration: none; cursor: pointer; }
a.button:hover, button:hover:not(:disabled) { background: #2d2d2d; color: #fff; }
button:disabled { opacity: .4; cursor: default; }
.hero { text-align: center; padding: 8rem 2rem; }
.hero h1 { font-size: 4.5rem; font-style: italic; margin: 0 0 1rem; }
.services { display: grid; grid-template-columns: repeat(3, 1fr); gap: 2rem; padding: 4rem; }
.card { background: #fff; border: 1px solid #f5e6e0; padding: 2rem; }
.wizard { max-width: 40rem; margin: 3rem auto; padding: 0 1.5rem; }
.progress { height: 4px; background: #f5e6e0; }
.progress > div { height: 4px; background: #d4a373; transition: width .3s; }
.error { color: #b3261e; font-size: .85rem; }
.choice.selected { background: #2d2d2d; color: #fff; }
"#;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn layout(title: &str, head: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n{head}</head>\n<body>\n{body}\n</body>\n</html>\n",
        title = escape(title),
    )
}

/// Landing view with one entry point per event type.
pub fn landing() -> String {
    let cards: String = [
        ("wedding", EventType::Wedding),
        ("birthday", EventType::Birthday),
        ("private", EventType::OtherEvent),
    ]
    .iter()
    .map(|(hint, event_type)| {
        format!(
            "<div class=\"card\"><h3>{name}</h3><p>{description}</p>\
             <a href=\"/questionnaire?type={hint}\">Plan yours</a></div>",
            name = escape(&event_type.to_string()),
            description = escape(event_type.description()),
        )
    })
    .collect();

    let body = format!(
        "<header><strong>Vowza</strong><a class=\"button\" href=\"/questionnaire\">Log In</a></header>\n\
         <section class=\"hero\"><h1>Vowza</h1><p>Premier Event Creators</p>\
         <a class=\"button\" href=\"/questionnaire\">Discovery Call</a></section>\n\
         <section class=\"services\">{cards}</section>"
    );
    layout("Vowza | Premier Event Creators", "", &body)
}

/// Questionnaire shell bound to one intake session. The embedded script
/// renders session snapshots and forwards visitor actions to the JSON API.
pub fn questionnaire(session: Uuid, turnstile_site_key: Option<&str>) -> String {
    let head = match turnstile_site_key {
        Some(_) => {
            "<script src=\"https://challenges.cloudflare.com/turnstile/v0/api.js\" async defer></script>\n"
        }
        None => "",
    };
    let widget = match turnstile_site_key {
        Some(key) => format!(
            "<div class=\"cf-turnstile\" data-sitekey=\"{}\" data-callback=\"vowzaVerified\"></div>",
            escape(key)
        ),
        None => "<button id=\"verify\" type=\"button\">I am human</button>".to_string(),
    };

    let body = format!(
        "<header><a href=\"/\"><strong>Vowza</strong></a><span id=\"step\"></span></header>\n\
         <div class=\"progress\"><div id=\"bar\"></div></div>\n\
         <main class=\"wizard\" data-session=\"{session}\">\n\
         <h2 id=\"title\"></h2><p id=\"subtitle\"></p>\n\
         <div id=\"stage\"></div>\n\
         <div id=\"verification\" hidden>{widget}</div>\n\
         <p id=\"submit-error\" class=\"error\"></p>\n\
         <nav><button id=\"back\">Back</button> <button id=\"next\">Continue</button></nav>\n\
         </main>\n<script>{script}</script>",
        script = SCRIPT
            .replace("__SESSION__", &session.to_string())
            .replace("__OPTIONS__", &choice_options()),
    );
    layout("Plan your event | Vowza", head, &body)
}

/// The selectable values with their descriptions, as a script literal.
fn choice_options() -> String {
    let event_types: Vec<_> = EventType::ALL
        .iter()
        .map(|v| json!({ "value": v, "description": v.description() }))
        .collect();
    let event_settings: Vec<_> = EventSetting::ALL
        .iter()
        .map(|v| json!({ "value": v, "description": v.description() }))
        .collect();
    let meals: Vec<_> = MealPreference::ALL
        .iter()
        .map(|v| json!({ "value": v, "description": v.description() }))
        .collect();
    json!({
        "eventTypes": event_types,
        "eventSettings": event_settings,
        "meals": meals,
    })
    .to_string()
    .replace("</", "<\\/")
}

const SCRIPT: &str = r#"
const base = '/api/intake/sessions/__SESSION__';
const options = __OPTIONS__;
let view = null;
let rendered = null;
const pending = {};
function esc(value) {
  return String(value ?? '').replace(/[&<>"']/g, c => ({ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' })[c]);
}
async function call(path, body) {
  const resp = await fetch(base + path, {
    method: path ? 'POST' : 'GET',
    headers: { 'content-type': 'application/json' },
    body: path ? JSON.stringify(body || {}) : undefined,
  });
  const data = await resp.json();
  if (data.session) { render(data.session); } else if (data.stage) { render(data); }
  return data;
}
function input(field, label, value, type) {
  const err = view.field_errors[field] || '';
  return `<label>${esc(label)}<br><input data-field="${esc(field)}" type="${esc(type)}" value="${esc(value)}"></label>` +
    `<div class="error" data-error-for="${esc(field)}">${esc(err)}</div>`;
}
function choices(kind, list, isSelected) {
  return list.map(o => `<button class="choice ${isSelected(o.value) ? 'selected' : ''}" data-${kind}="${esc(o.value)}" title="${esc(o.description)}">${esc(o.value)}</button>`).join(' ');
}
function renderErrors(v) {
  document.querySelectorAll('[data-error-for]').forEach(el => { el.textContent = v.field_errors[el.dataset.errorFor] || ''; });
}
function render(v) {
  view = v;
  document.getElementById('title').textContent = v.title;
  document.getElementById('subtitle').textContent = v.subtitle;
  document.getElementById('step').textContent = `Step ${v.stage_index + 1} of ${v.stage_count}`;
  document.getElementById('bar').style.width = v.progress_percent + '%';
  document.getElementById('submit-error').textContent = v.submit_error || '';
  document.getElementById('verification').hidden = v.stage !== 'review';
  document.getElementById('back').disabled = !v.can_retreat;
  const next = document.getElementById('next');
  next.textContent = v.stage === 'review' ? (v.submitting ? 'Submitting…' : 'Submit') : 'Continue';
  next.disabled = v.stage === 'review' ? !v.can_submit : !v.can_advance;
  const focused = document.activeElement;
  if (rendered === v.stage && focused && focused.dataset && focused.dataset.field) { renderErrors(v); return; }
  rendered = v.stage;
  const d = v.draft;
  const stage = {
    contact_info: () => input('name', 'Name', d.name, 'text') + input('phone', 'Phone', d.phone, 'tel') + input('email', 'Email', d.email, 'email'),
    event_type: () => choices('event-type', options.eventTypes, o => o === d.eventType),
    event_setting: () => choices('event-setting', options.eventSettings, o => o === d.eventSetting),
    guest_count: () => '<button data-guests="decrement">-</button> ' + input('guestCount', 'Guests', d.numberOfPeople, 'number') + ' <button data-guests="increment">+</button>',
    meal_preferences: () => choices('meal', options.meals, o => d.mealOptions.includes(o)),
    review: () => `<p>${esc(d.name)} · ${esc(d.phone)} · ${esc(d.email)} <button data-jump="contact_info">Edit</button></p>` +
      `<p>${esc(d.eventType)} · ${esc(d.eventSetting)} · ${esc(d.numberOfPeople)} guests <button data-jump="event_type">Edit</button></p>` +
      `<p>${esc(d.mealOptions.join(', '))} <button data-jump="meal_preferences">Edit</button></p>`,
  }[v.stage]();
  document.getElementById('stage').innerHTML = stage;
}
function sendField(el) {
  clearTimeout(pending[el.dataset.field]);
  delete pending[el.dataset.field];
  return call('/fields', { field: el.dataset.field, value: el.value });
}
async function submit() {
  const data = await call('/submit');
  if (data.session && data.session.notice) { alert(data.session.notice.message); }
  if (data.outcome && data.outcome.status === 'submitted') {
    setTimeout(() => { window.location.href = data.outcome.redirect_to; }, data.outcome.redirect_after_ms);
  }
}
window.vowzaVerified = token => call('/verification', { token });
document.addEventListener('input', e => {
  const f = e.target.dataset.field;
  if (!f) return;
  clearTimeout(pending[f]);
  pending[f] = setTimeout(() => sendField(e.target), 150);
});
document.addEventListener('click', e => {
  const t = e.target.dataset;
  if (t.eventType) call('/event-type', { value: t.eventType });
  else if (t.eventSetting) call('/event-setting', { value: t.eventSetting });
  else if (t.guests) call('/guests/' + t.guests);
  else if (t.meal) call('/meals/toggle', { meal: t.meal });
  else if (t.jump) call('/jump', { stage: t.jump });
  else if (e.target.id === 'verify') call('/verification', { token: 'local-' + Date.now() });
  else if (e.target.id === 'back') call('/retreat');
  else if (e.target.id === 'next') view.stage === 'review' ? submit() : call('/advance');
});
document.addEventListener('keydown', async e => {
  if (e.key !== 'Enter' && e.key !== 'Escape') return;
  if (e.target.dataset && e.target.dataset.field) { await sendField(e.target); }
  if (e.key === 'Enter' && view.stage === 'review') { if (view.can_submit) submit(); return; }
  call('/keys', { key: e.key });
});
setInterval(() => { if (view && view.auto_advance_pending) call(''); }, 150);
call('');
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_links_each_event_hint() {
        let html = landing();
        for hint in ["wedding", "birthday", "private"] {
            assert!(html.contains(&format!("/questionnaire?type={hint}")));
        }
        assert!(html.contains("Premier Event Creators"));
    }

    #[test]
    fn questionnaire_embeds_session_and_site_key() {
        let id = Uuid::new_v4();
        let html = questionnaire(id, Some("site-\"key"));
        assert!(html.contains(&format!("/api/intake/sessions/{id}")));
        assert!(html.contains("data-sitekey=\"site-&quot;key\""));
        assert!(html.contains("turnstile/v0/api.js"));

        let html = questionnaire(id, None);
        assert!(!html.contains("cf-turnstile"));
        assert!(html.contains("id=\"verify\""));
    }

    #[test]
    fn questionnaire_lists_every_choice() {
        let html = questionnaire(Uuid::new_v4(), None);
        assert!(!html.contains("__OPTIONS__"));
        for value in ["Wedding", "Birthday", "Other Event", "Indoor", "Outdoor"] {
            assert!(html.contains(&format!("\"value\":\"{value}\"")), "{value}");
        }
        for meal in MealPreference::ALL {
            assert!(html.contains(meal.description()));
        }
    }

    #[test]
    fn script_escapes_draft_values() {
        assert!(SCRIPT.contains("function esc("));
        // Every draft value is interpolated through esc().
        assert!(!SCRIPT.contains("${d."));
        assert!(!SCRIPT.contains("${value"));
        assert!(!SCRIPT.contains("${err}"));
        assert!(SCRIPT.contains("value=\"${esc(value)}\""));
    }

    #[test]
    fn fields_sync_while_typing() {
        assert!(SCRIPT.contains("addEventListener('input'"));
        assert!(!SCRIPT.contains("addEventListener('change'"));
    }
}
