// Static legal pages served as HTML

use axum::response::Html;

/// GET /pages/imprint
pub async fn imprint() -> Html<&'static str> {
    Html(IMPRINT_HTML)
}

/// GET /pages/privacy
pub async fn privacy() -> Html<&'static str> {
    Html(PRIVACY_HTML)
}

const IMPRINT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Imprint - Contact Tables</title>
  <style>
    body { font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; color: #1f2933; max-width: 720px; margin: 0 auto; padding: 48px 24px; }
    h1 { font-size: 28px; }
  </style>
</head>
<body>
  <h1>Imprint</h1>
  <p>Contact Tables GmbH<br>
  Hauptstra&szlig;e 1<br>
  10115 Berlin<br>
  Germany</p>
  <p>Represented by the managing directors.<br>
  Commercial register: Amtsgericht Charlottenburg</p>
  <p>Contact: <a href="mailto:support@contact-tables.app">support@contact-tables.app</a></p>
  <p>Responsible for content pursuant to &sect; 18 Abs. 2 MStV: the managing directors, address as above.</p>
</body>
</html>
"#;

const PRIVACY_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Privacy Policy - Contact Tables</title>
  <style>
    body { font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; color: #1f2933; max-width: 720px; margin: 0 auto; padding: 48px 24px; }
    h1 { font-size: 28px; }
    h2 { font-size: 20px; margin-top: 32px; }
  </style>
</head>
<body>
  <h1>Privacy Policy</h1>
  <p>This policy explains what personal data Contact Tables processes and why.</p>

  <h2>What we store</h2>
  <p>Account data (email address, name, optional phone number), restaurant
  profiles, table reservations, and messages sent through the contact form.
  Passwords are stored only as salted Argon2id hashes.</p>

  <h2>Why we store it</h2>
  <p>To operate the platform: authenticating you, showing restaurant profiles
  to guests, managing reservations, and responding to inquiries. We do not
  sell personal data.</p>

  <h2>Emails</h2>
  <p>We send transactional emails only: verification codes, password resets,
  reservation confirmations, and onboarding decisions.</p>

  <h2>Retention and deletion</h2>
  <p>Account data is kept while the account exists. You can request deletion
  at any time via <a href="mailto:support@contact-tables.app">support@contact-tables.app</a>.</p>

  <h2>Your rights</h2>
  <p>Under the GDPR you have the right to access, rectify, and erase your
  personal data, and to data portability. Contact us at the address in the
  imprint to exercise these rights.</p>
</body>
</html>
"#;
