//! Node lifecycle against a real socket.

use std::sync::Arc;

use fundrelay_node::{Allocation, LedgerNode, NodeConfig};
use fundrelay_nullables::NullClock;
use fundrelay_registry::CampaignDraft;
use fundrelay_types::{Address, Amount};
use serde_json::{json, Value};

fn config(dir: &tempfile::TempDir) -> NodeConfig {
    NodeConfig {
        rpc_port: 0,
        snapshot_path: Some(dir.path().join("ledger.json")),
        allocations: vec![Allocation {
            account: Address::from_label("alice"),
            amount: Amount::whole(250),
        }],
        ..NodeConfig::dev()
    }
}

fn draft() -> CampaignDraft {
    serde_json::from_value(json!({
        "name": "Library",
        "description": "Books for the village",
        "media_ref": "bafy-library",
        "milestones": [{ "name": "shelves", "goal": "100" }]
    }))
    .unwrap()
}

#[tokio::test]
async fn serves_rpc_and_persists_on_stop() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(NullClock::new(1_000));
    let mut node = LedgerNode::new(config(&dir), clock.clone()).unwrap();
    node.start().await.unwrap();
    let addr = node.local_addr().unwrap();

    let alice = Address::from_label("alice");
    let body: Value = reqwest::get(format!("http://{addr}/accounts/{alice}/balance"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["balance"], "250");

    let manager = Address::from_label("manager");
    let (campaign, _) = node
        .chain()
        .transact(|c| c.create_campaign(manager, draft()))
        .await
        .unwrap();

    node.stop().await.unwrap();
    assert!(node.local_addr().is_none());

    let restored = LedgerNode::new(config(&dir), clock).unwrap();
    let (campaigns, balance) = restored
        .chain()
        .read(|c| (c.registry().list_campaigns(), c.balance_of(&alice)))
        .await;
    assert_eq!(campaigns, vec![campaign]);
    assert_eq!(balance, Amount::whole(250));
}

#[tokio::test]
async fn allocations_only_apply_to_fresh_ledgers() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(NullClock::new(0));
    let node = LedgerNode::new(config(&dir), clock.clone()).unwrap();
    assert!(node.snapshot_now().await.unwrap());

    let restored = LedgerNode::new(config(&dir), clock).unwrap();
    let balance = restored
        .chain()
        .read(|c| c.balance_of(&Address::from_label("alice")))
        .await;
    assert_eq!(balance, Amount::whole(250));
}

#[tokio::test]
async fn metrics_follow_the_event_feed() {
    let dir = tempfile::tempdir().unwrap();
    let mut node = LedgerNode::new(config(&dir), Arc::new(NullClock::new(0))).unwrap();
    node.start().await.unwrap();

    node.chain()
        .transact(|c| c.create_campaign(Address::from_label("manager"), draft()))
        .await
        .unwrap();

    let mut seen = 0;
    for _ in 0..50 {
        seen = node.metrics().campaign_count.get();
        if seen == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(seen, 1);
    assert_eq!(
        node.metrics()
            .events
            .with_label_values(&["campaign_created"])
            .get(),
        1
    );

    let text = reqwest::get(format!("http://{}/metrics", node.local_addr().unwrap()))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains("fundrelay_campaign_count 1"));

    node.stop().await.unwrap();
}

#[tokio::test]
async fn starting_twice_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let mut node = LedgerNode::new(config(&dir), Arc::new(NullClock::new(0))).unwrap();
    node.start().await.unwrap();
    assert!(node.start().await.is_err());
    node.stop().await.unwrap();
}
