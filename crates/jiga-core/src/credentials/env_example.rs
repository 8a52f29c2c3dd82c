use std::fs;
use std::io;
use std::path::Path;

use tracing::info;

pub const ENV_EXAMPLE_FILE: &str = ".env.example";

pub const ENV_EXAMPLE_TEMPLATE: &str = r#"# JIGA Store Environment Variables

# Firebase/GCP
FIREBASE_PROJECT_ID=
FIREBASE_PRIVATE_KEY=
FIREBASE_CLIENT_EMAIL=
STORAGE_BUCKET=
# Point the tools at a local emulator instead of the hosted project
FIRESTORE_EMULATOR_HOST=

# Seeding
JIGA_DATA_DIR=data

# Shopify
SHOPIFY_SHOP_DOMAIN=
SHOPIFY_ADMIN_API_TOKEN=
SHOPIFY_STOREFRONT_API_TOKEN=
SHOPIFY_WEBHOOK_SECRET=

# AI Providers
OPENAI_API_KEY=
GOOGLE_AI_API_KEY=
GOOGLE_TTS_CREDENTIALS_PATH=

# Search
ALGOLIA_APP_ID=
ALGOLIA_ADMIN_API_KEY=
ALGOLIA_SEARCH_API_KEY=

# Caching (Optional)
REDIS_URL=

# Email
SENDGRID_API_KEY=
SENDGRID_FROM_EMAIL=

# Moderation
PERSPECTIVE_API_KEY=

# Analytics (Optional)
GA_MEASUREMENT_ID=
SENTRY_DSN=

# CDN (Optional)
CLOUDFLARE_API_TOKEN=
CLOUDFLARE_ZONE_ID=

# Logging
RUST_LOG=info
API_URL=http://localhost:3000
APP_URL=http://localhost:3001
"#;

/// Write the template into `dir` unless a `.env.example` is already there.
/// Returns whether a file was created.
pub fn write_env_example(dir: &Path) -> io::Result<bool> {
    let path = dir.join(ENV_EXAMPLE_FILE);
    if path.exists() {
        return Ok(false);
    }
    fs::write(&path, ENV_EXAMPLE_TEMPLATE)?;
    info!(path = %path.display(), "Created .env.example file");
    Ok(true)
}
