use std::sync::Arc;
use std::time::Duration;

use warden_bot::{ModuleCatalog, Services, TenantRouter, serve};
use warden_core::{ChannelId, TenantId, UserId};
use warden_events::{Author, InboundEvent};
use warden_infra::{InMemoryPlatform, InMemoryPolicyStore, WardenConfig};

const SLOW: TenantId = TenantId::new(100);
const FAST: TenantId = TenantId::new(200);
const SLOW_CHANNEL: ChannelId = ChannelId::new(1);
const FAST_CHANNEL: ChannelId = ChannelId::new(2);
const SLOW_OWNER: UserId = UserId::new(10);
const FAST_OWNER: UserId = UserId::new(20);

fn setup() -> (Arc<InMemoryPlatform>, Arc<TenantRouter>) {
    let platform = Arc::new(InMemoryPlatform::new());
    let config = WardenConfig {
        lookup_timeout: Duration::from_secs(1),
        ..WardenConfig::default()
    };
    let services = Arc::new(Services::new(
        platform.clone(),
        Arc::new(InMemoryPolicyStore::new()),
        ModuleCatalog::standard(),
        config,
    ));
    (platform, Arc::new(TenantRouter::new(services)))
}

fn line(tenant: TenantId, channel: ChannelId, author: UserId, content: &str) -> String {
    let event = InboundEvent::in_workspace(tenant, channel, Author::user(author, "owner"), content);
    serde_json::to_string(&event).unwrap()
}

#[tokio::test]
async fn slow_tenant_does_not_block_others() {
    let (platform, router) = setup();
    platform.add_workspace(SLOW, SLOW_OWNER);
    platform.set_workspace_delay(SLOW, Some(Duration::from_millis(300)));

    let input = format!(
        "{}\n{}\n",
        line(SLOW, SLOW_CHANNEL, SLOW_OWNER, "$sudoers"),
        line(FAST, FAST_CHANNEL, FAST_OWNER, "$sudoers"),
    );
    serve(router.clone(), platform.clone(), input.as_bytes())
        .await
        .unwrap();

    let channels: Vec<_> = platform
        .sent_messages()
        .into_iter()
        .map(|m| m.channel_id)
        .collect();
    assert_eq!(channels, vec![FAST_CHANNEL, SLOW_CHANNEL]);
    assert_eq!(router.len(), 2);
}

#[tokio::test]
async fn malformed_lines_are_skipped() {
    let (platform, router) = setup();

    let input = format!(
        "not json\n\n{}\n",
        line(FAST, FAST_CHANNEL, FAST_OWNER, "$loaded_extensions"),
    );
    serve(router, platform.clone(), input.as_bytes()).await.unwrap();

    assert_eq!(
        platform.last_message(FAST_CHANNEL).as_deref(),
        Some("admin, safety")
    );
    assert_eq!(platform.sent_messages().len(), 1);
}

#[tokio::test]
async fn shutdown_command_stops_the_loop() {
    let (platform, router) = setup();
    let (mut writer, reader) = tokio::io::duplex(1024);

    let running = tokio::spawn(serve(
        router,
        platform.clone(),
        tokio::io::BufReader::new(reader),
    ));
    let shutdown = line(FAST, FAST_CHANNEL, FAST_OWNER, "$shutdown");
    tokio::io::AsyncWriteExt::write_all(&mut writer, format!("{shutdown}\n").as_bytes())
        .await
        .unwrap();

    // The writer stays open, so only the shutdown request ends the loop.
    tokio::time::timeout(Duration::from_secs(1), running)
        .await
        .expect("serve did not stop")
        .unwrap()
        .unwrap();
    assert_eq!(
        platform.last_message(FAST_CHANNEL).as_deref(),
        Some("Shutting down")
    );
}
