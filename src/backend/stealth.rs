//! Fingerprint evasion and page-side scripts.
//!
//! Launch flags, request headers and the JavaScript evaluated inside the
//! page. Kept free of browser types so the offline build can test them.

use serde_json::{json, Value};

/// Browser flags for scripted sessions.
pub const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-popup-blocking",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-translate",
    "--metrics-recording-only",
    "--password-store=basic",
    "--window-size=1920,1080",
    "--lang=en-US",
];

/// User agent of a current desktop Chrome.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

/// Extra request headers matching [`USER_AGENT`].
#[must_use]
pub fn extra_headers() -> Value {
    json!({
        "Accept-Language": ACCEPT_LANGUAGE,
        "sec-ch-ua": "\"Google Chrome\";v=\"131\", \"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"",
        "sec-ch-ua-mobile": "?0",
        "sec-ch-ua-platform": "\"Windows\"",
        "Upgrade-Insecure-Requests": "1",
    })
}

/// Evaluated on every new document before page scripts run.
pub const STEALTH_SCRIPT: &str = r##"
(() => {
  const define = (obj, key, value) => {
    try { Object.defineProperty(obj, key, { get: () => value, configurable: true }); } catch (_) {}
  };

  // Automation flag
  define(Navigator.prototype, 'webdriver', undefined);

  // Navigator surface
  define(navigator, 'languages', ['en-US', 'en']);
  define(navigator, 'platform', 'Win32');
  define(navigator, 'vendor', 'Google Inc.');
  define(navigator, 'hardwareConcurrency', 8);
  define(navigator, 'deviceMemory', 8);
  define(navigator, 'maxTouchPoints', 0);
  define(navigator, 'plugins', [1, 2, 3, 4, 5]);
  if (navigator.userAgentData) {
    define(navigator, 'userAgentData', {
      brands: [
        { brand: 'Google Chrome', version: '131' },
        { brand: 'Chromium', version: '131' },
        { brand: 'Not_A Brand', version: '24' }
      ],
      mobile: false,
      platform: 'Windows'
    });
  }

  window.chrome = window.chrome || {};
  window.chrome.runtime = window.chrome.runtime || {};

  const originalQuery = navigator.permissions && navigator.permissions.query;
  if (originalQuery) {
    navigator.permissions.query = (params) => (
      params && params.name === 'notifications'
        ? Promise.resolve({ state: Notification.permission })
        : originalQuery.call(navigator.permissions, params)
    );
  }

  // Screen geometry consistent with the viewport
  define(screen, 'width', 1920);
  define(screen, 'height', 1080);
  define(screen, 'availWidth', 1920);
  define(screen, 'availHeight', 1040);
  define(screen, 'colorDepth', 24);
  define(window, 'outerWidth', 1920);
  define(window, 'outerHeight', 1080);

  // Headless builds report zeroed memory
  if (performance && performance.memory) {
    define(performance, 'memory', {
      jsHeapSizeLimit: 4294705152,
      totalJSHeapSize: 35000000,
      usedJSHeapSize: 25000000
    });
  }

  // Canvas noise
  const toDataURL = HTMLCanvasElement.prototype.toDataURL;
  HTMLCanvasElement.prototype.toDataURL = function (...args) {
    const data = toDataURL.apply(this, args);
    return data.replace(/.$/, String.fromCharCode(48 + (Math.random() * 10 | 0)));
  };
  const getImageData = CanvasRenderingContext2D.prototype.getImageData;
  CanvasRenderingContext2D.prototype.getImageData = function (...args) {
    const image = getImageData.apply(this, args);
    if (image && image.data && image.data.length > 3) {
      image.data[0] = image.data[0] ^ 1;
    }
    return image;
  };

  // WebGL vendor/renderer instead of SwiftShader
  const patchWebGl = (proto) => {
    if (!proto) return;
    const getParameter = proto.getParameter;
    proto.getParameter = function (parameter) {
      if (parameter === 37445) return 'Intel Inc.';
      if (parameter === 37446) return 'Intel Iris OpenGL Engine';
      return getParameter.apply(this, arguments);
    };
  };
  patchWebGl(window.WebGLRenderingContext && WebGLRenderingContext.prototype);
  patchWebGl(window.WebGL2RenderingContext && WebGL2RenderingContext.prototype);

  // Driver marker globals
  for (const key of Object.keys(window)) {
    if (/^cdc_|^\$cdc_|^\$wdc_/.test(key)) { try { delete window[key]; } catch (_) {} }
  }
  for (const key of ['__playwright', '__puppeteer', '__pwInitScripts', '__selenium', '__webdriver_script_fn',
                     '__nightmare', 'callPhantom', '_phantom', 'phantom', 'domAutomation', 'domAutomationController']) {
    try { delete window[key]; } catch (_) {}
  }
  for (const key of ['__selenium_unwrapped', '__webdriver_evaluate', '__driver_evaluate',
                     '__webdriver_script_function', '__fxdriver_evaluate', '__driver_unwrapped']) {
    try { delete document[key]; } catch (_) {}
  }
})();
"##;

/// Returns `{ title, bodyText }` for a [`super::PageProbe`].
pub const PROBE_SCRIPT: &str = r##"
(() => ({
  title: document.title || '',
  bodyText: document.body ? (document.body.innerText || '') : ''
}))()
"##;

/// Scrolls every scrollable container to its end and returns nothing.
pub const SCROLL_SCRIPT: &str = r##"
(() => {
  window.scrollTo(0, document.body ? document.body.scrollHeight : 0);
  for (const el of document.querySelectorAll('*')) {
    if (el.scrollHeight > el.clientHeight + 50) {
      const style = getComputedStyle(el);
      if (style.overflowY === 'auto' || style.overflowY === 'scroll') {
        el.scrollTop = el.scrollHeight;
      }
    }
  }
  return true;
})()
"##;

/// Serializes the document, inlining open shadow roots as
/// `<share-shadow-root>` elements placed first inside their host.
pub const SNAPSHOT_SCRIPT: &str = r##"
(() => {
  const VOID = new Set(['area', 'base', 'br', 'col', 'embed', 'hr', 'img', 'input',
                        'link', 'meta', 'source', 'track', 'wbr']);
  const SKIP = new Set(['script', 'noscript']);
  const text = (s) => s.replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;');
  const quote = (s) => s.replace(/&/g, '&amp;').replace(/"/g, '&quot;');

  const children = (node) => {
    let out = '';
    for (const child of node.childNodes) out += serialize(child);
    return out;
  };

  const serialize = (node) => {
    if (node.nodeType === Node.TEXT_NODE) {
      const parent = node.parentNode && node.parentNode.localName;
      return parent === 'style' ? node.data : text(node.data);
    }
    if (node.nodeType !== Node.ELEMENT_NODE) return '';
    const tag = node.localName;
    if (SKIP.has(tag)) return '';
    let out = '<' + tag;
    for (const attr of node.attributes) out += ' ' + attr.name + '="' + quote(attr.value) + '"';
    out += '>';
    if (VOID.has(tag)) return out;
    if (node.shadowRoot) out += '<share-shadow-root>' + children(node.shadowRoot) + '</share-shadow-root>';
    out += children(tag === 'template' ? node.content : node);
    return out + '</' + tag + '>';
  };

  return '<!DOCTYPE html>' + serialize(document.documentElement);
})()
"##;

/// Script counting `selector` matches across the document and every open
/// shadow root.
#[must_use]
pub fn count_script(selector: &str) -> String {
    // JSON string literals are valid JavaScript string literals.
    let literal = Value::String(selector.to_string()).to_string();
    format!(
        r##"
(() => {{
  const selector = {literal};
  let count = 0;
  const visit = (root) => {{
    try {{ count += root.querySelectorAll(selector).length; }} catch (_) {{ return; }}
    for (const el of root.querySelectorAll('*')) {{
      if (el.shadowRoot) visit(el.shadowRoot);
    }}
  }};
  visit(document);
  return count;
}})()
"##
    )
}
