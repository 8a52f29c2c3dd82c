use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use jiga_core::credentials::{
    verify, write_env_example, EnvSnapshot, HttpProber, Probe, ProbeEndpoints, ProbeOutcome,
    ServiceProber, ENV_EXAMPLE_FILE, ENV_EXAMPLE_TEMPLATE, SERVICES,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Answers from a fixed table and remembers what it was asked.
#[derive(Default)]
struct ScriptedProber {
    failing: Vec<Probe>,
    calls: Mutex<Vec<Probe>>,
}

#[async_trait]
impl ServiceProber for ScriptedProber {
    async fn probe(&self, probe: Probe, _env: &EnvSnapshot) -> ProbeOutcome {
        self.calls.lock().unwrap().push(probe);
        if self.failing.contains(&probe) {
            ProbeOutcome::Failed("Status: 401".to_string())
        } else {
            ProbeOutcome::Connected
        }
    }
}

fn required_env() -> EnvSnapshot {
    let pairs = SERVICES
        .iter()
        .filter(|service| !service.optional)
        .flat_map(|service| service.vars.iter())
        .map(|var| (*var, "configured"));
    EnvSnapshot::from_pairs(pairs)
}

#[tokio::test]
async fn missing_required_var_fails_verification() {
    let env = EnvSnapshot::from_pairs([("OPENAI_API_KEY", "sk-test"), ("SHOPIFY_SHOP_DOMAIN", "")]);
    let prober = ScriptedProber::default();

    let report = verify(&env, false, &prober).await;

    assert!(!report.all_required_valid());
    let shopify = report.result("Shopify").unwrap();
    assert!(!shopify.valid);
    assert_eq!(
        shopify.missing_vars,
        ["SHOPIFY_SHOP_DOMAIN", "SHOPIFY_ADMIN_API_TOKEN"]
    );
    assert!(report.result("OpenAI").unwrap().valid);
    assert!(prober.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn optional_services_never_fail_the_run() {
    let report = verify(&required_env(), false, &ScriptedProber::default()).await;

    assert!(report.all_required_valid());
    for name in ["Redis", "Google Analytics", "Sentry"] {
        let result = report.result(name).unwrap();
        assert!(result.optional);
        assert!(!result.valid);
    }
    let table = report.render_table().to_string();
    assert!(table.contains("Redis"));
    assert!(table.contains("missing REDIS_URL"));
}

#[tokio::test]
async fn probes_run_only_for_configured_services() {
    let prober = ScriptedProber {
        failing: vec![Probe::SendGrid],
        ..Default::default()
    };

    let report = verify(&required_env(), true, &prober).await;

    let calls = prober.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 6);
    assert!(!calls.contains(&Probe::Redis));
    assert!(!report.all_required_valid());
    let sendgrid = report.result("SendGrid").unwrap();
    assert_eq!(sendgrid.probe, Some(ProbeOutcome::Failed("Status: 401".to_string())));
    assert!(report.result("Algolia").unwrap().valid);
}

#[tokio::test]
async fn http_prober_reports_status_codes() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("authorization", "Bearer sk-bad"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(query_param("key", "good-key"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let prober = HttpProber::new(ProbeEndpoints {
        openai: server.uri(),
        google_ai: server.uri(),
        ..Default::default()
    })?;
    let env = EnvSnapshot::from_pairs([
        ("OPENAI_API_KEY", "sk-bad"),
        ("GOOGLE_AI_API_KEY", "good-key"),
    ]);

    assert_eq!(
        prober.probe(Probe::OpenAi, &env).await,
        ProbeOutcome::Failed("Status: 401".to_string())
    );
    assert_eq!(prober.probe(Probe::GoogleAi, &env).await, ProbeOutcome::Connected);
    Ok(())
}

#[tokio::test]
async fn http_prober_sends_shopify_token() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/api/2024-01/shop.json"))
        .and(header("x-shopify-access-token", "shpat_test"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let domain = server.address().to_string();
    let prober = HttpProber::new(ProbeEndpoints {
        shopify_scheme: "http".to_string(),
        ..Default::default()
    })?;
    let env = EnvSnapshot::from_pairs([
        ("SHOPIFY_SHOP_DOMAIN", domain.as_str()),
        ("SHOPIFY_ADMIN_API_TOKEN", "shpat_test"),
    ]);

    assert_eq!(prober.probe(Probe::Shopify, &env).await, ProbeOutcome::Connected);
    Ok(())
}

#[tokio::test]
async fn analytics_and_sentry_are_warnings() -> Result<()> {
    let prober = HttpProber::new(ProbeEndpoints::default())?;
    let env = EnvSnapshot::from_pairs([
        ("GA_MEASUREMENT_ID", "G-TEST"),
        ("SENTRY_DSN", "https://public@o0.ingest.sentry.io/1"),
    ]);

    assert!(matches!(
        prober.probe(Probe::GoogleAnalytics, &env).await,
        ProbeOutcome::Warning(_)
    ));
    assert!(matches!(
        prober.probe(Probe::Sentry, &env).await,
        ProbeOutcome::Warning(_)
    ));
    Ok(())
}

type Commands = Arc<Mutex<Vec<Vec<String>>>>;

/// Serves just enough RESP for a client handshake and `PING`, recording every
/// command it receives. `AUTH` succeeds only with `password`.
async fn start_redis(password: &'static str) -> Result<(u16, Commands)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let commands = Commands::default();

    let seen = commands.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_redis(stream, password, seen.clone()));
        }
    });
    Ok((port, commands))
}

async fn serve_redis(stream: TcpStream, password: &'static str, seen: Commands) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).await.unwrap_or(0) == 0 {
            return;
        }
        let count: usize = header.trim_start_matches('*').trim().parse().unwrap_or(0);
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            let mut len_line = String::new();
            reader.read_line(&mut len_line).await.unwrap();
            let len: usize = len_line.trim_start_matches('$').trim().parse().unwrap();
            let mut data = vec![0; len + 2];
            reader.read_exact(&mut data).await.unwrap();
            args.push(String::from_utf8_lossy(&data[..len]).into_owned());
        }

        let reply = match args.first().map(|name| name.to_ascii_uppercase()).as_deref() {
            Some("AUTH") if args.last().map(String::as_str) == Some(password) => "+OK\r\n",
            Some("AUTH") => "-WRONGPASS invalid username-password pair\r\n",
            Some("PING") => "+PONG\r\n",
            _ => "+OK\r\n",
        };
        seen.lock().unwrap().push(args);
        if writer.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}

#[tokio::test]
async fn redis_password_is_percent_decoded() -> Result<()> {
    let (port, commands) = start_redis("p@ss").await?;
    let prober = HttpProber::new(ProbeEndpoints::default())?;
    let env = EnvSnapshot::from_pairs([(
        "REDIS_URL",
        format!("redis://:p%40ss@127.0.0.1:{port}"),
    )]);

    assert_eq!(prober.probe(Probe::Redis, &env).await, ProbeOutcome::Connected);

    let commands = commands.lock().unwrap().clone();
    let auth = commands
        .iter()
        .find(|args| args.first().is_some_and(|name| name.eq_ignore_ascii_case("AUTH")))
        .expect("AUTH sent");
    assert_eq!(auth.last().map(String::as_str), Some("p@ss"));
    assert!(commands
        .iter()
        .any(|args| args.first().is_some_and(|name| name.eq_ignore_ascii_case("PING"))));
    Ok(())
}

#[tokio::test]
async fn redis_wrong_password_fails() -> Result<()> {
    let (port, _) = start_redis("p@ss").await?;
    let prober = HttpProber::new(ProbeEndpoints::default())?;
    let env = EnvSnapshot::from_pairs([("REDIS_URL", format!("redis://:nope@127.0.0.1:{port}"))]);

    assert!(matches!(
        prober.probe(Probe::Redis, &env).await,
        ProbeOutcome::Failed(_)
    ));
    Ok(())
}

#[test]
fn env_example_is_written_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let target = dir.path().join(ENV_EXAMPLE_FILE);

    assert!(write_env_example(dir.path())?);
    assert_eq!(std::fs::read_to_string(&target)?, ENV_EXAMPLE_TEMPLATE);

    std::fs::write(&target, "# edited\n")?;
    assert!(!write_env_example(dir.path())?);
    assert_eq!(std::fs::read_to_string(&target)?, "# edited\n");
    Ok(())
}
