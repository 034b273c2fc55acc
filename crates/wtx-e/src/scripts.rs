//! Scripts injected into pages under test.
//!
//! The collector records uncaught errors and XHR/fetch traffic in
//! `window.__wtx`. Installing it is idempotent and it is lost on every
//! navigation, so callers install it again before each read.

pub const INSTALL_COLLECTOR: &str = r#"
if (window.__wtx) { return false; }
var state = window.__wtx = { errors: [], responses: [], requests: 0, completed: 0 };
window.addEventListener('error', function (e) {
  state.errors.push({ source: String(e.filename || ''), line: e.lineno || 0, message: String(e.message) });
});
var open = XMLHttpRequest.prototype.open, send = XMLHttpRequest.prototype.send;
XMLHttpRequest.prototype.open = function (method, url) {
  this.__wtxUrl = String(url);
  return open.apply(this, arguments);
};
XMLHttpRequest.prototype.send = function () {
  var xhr = this;
  state.requests++;
  xhr.addEventListener('loadend', function () {
    state.completed++;
    state.responses.push({ uri: xhr.__wtxUrl || '', status: xhr.status });
  });
  return send.apply(this, arguments);
};
if (window.fetch) {
  var fetch = window.fetch;
  window.fetch = function (input) {
    var url = typeof input === 'string' ? input : (input && input.url) || '';
    state.requests++;
    return fetch.apply(this, arguments).then(function (response) {
      state.completed++;
      state.responses.push({ uri: url, status: response.status });
      return response;
    }, function (error) {
      state.completed++;
      throw error;
    });
  };
}
return true;
"#;

pub const TAKE_SCRIPT_ERRORS: &str = r#"
var state = window.__wtx;
if (!state) { return []; }
var errors = state.errors;
state.errors = [];
return errors;
"#;

pub const TAKE_HTTP_RESPONSES: &str = r#"
var state = window.__wtx;
if (!state) { return []; }
var responses = state.responses;
state.responses = [];
return responses;
"#;

pub const NETWORK_ACTIVITY: &str = r#"
var state = window.__wtx;
return state ? { requests: state.requests, responses: state.completed } : { requests: 0, responses: 0 };
"#;

pub const HOVER: &str = r#"
var el = arguments[0];
['mouseover', 'mouseenter', 'mousemove'].forEach(function (type) {
  el.dispatchEvent(new MouseEvent(type, { bubbles: type !== 'mouseenter', cancelable: true, view: window }));
});
"#;

/// XPath for the frame element named `name`, by `name` or `id`.
pub fn frame_xpath(name: &str) -> String {
    let literal = wtx_engine::wtx_common::selector::xpath_literal(name);
    format!(
        "//iframe[@name={0} or @id={0}] | //frame[@name={0} or @id={0}]",
        literal
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_lookup_matches_name_or_id() {
        assert_eq!(
            frame_xpath("side"),
            "//iframe[@name='side' or @id='side'] | //frame[@name='side' or @id='side']"
        );
        assert!(frame_xpath("it's").contains("\"it's\""));
    }
}
