use std::io::Write;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use craft_or_buy::{
    check_recipe,
    domain::{CraftError, PriceSource, ProfitIndicatorStatus, Quality, StatsConfig},
    infra::{catalog::JsonCatalog, universalis::UniversalisClient},
    report::render_text,
};

const CATALOG: &str = r#"{
    "items": [
        { "id": 1601, "name": "Iron Longsword", "can_be_hq": true },
        { "id": 5057, "name": "Iron Ingot", "can_be_hq": true },
        { "id": 2, "name": "Fire Shard", "can_be_hq": false }
    ],
    "recipes": [
        {
            "recipe_id": 31,
            "result_id": 1601,
            "ingredients": [
                { "item_id": 5057, "amount": 3, "shop_price": 50 },
                { "item_id": 2, "amount": 2, "shop_price": 0 },
                { "item_id": 0, "amount": 0 }
            ]
        },
        {
            "result_id": 1602,
            "ingredients": [ { "item_id": 9999, "amount": 1 } ]
        }
    ]
}"#;

fn catalog() -> (tempfile::NamedTempFile, JsonCatalog) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CATALOG.as_bytes()).unwrap();
    let catalog = JsonCatalog::load(file.path()).unwrap();
    (file, catalog)
}

fn client(server: &MockServer) -> UniversalisClient {
    UniversalisClient::with_base_url(&server.uri())
        .unwrap()
        .with_retries(2, Duration::from_millis(5))
}

fn listing(price: u64, mannequin: bool) -> serde_json::Value {
    json!({ "pricePerUnit": price, "quantity": 1, "onMannequin": mannequin, "worldName": "Tonberry" })
}

#[tokio::test]
async fn prices_a_recipe_end_to_end() {
    let server = MockServer::start().await;

    let normal = json!({
        "items": {
            "2": { "itemID": 2, "nqSaleVelocity": 90.0, "listings": [listing(10, false), listing(12, false)] },
            "1601": {
                "itemID": 1601,
                "nqSaleVelocity": 2.0,
                "listings": [listing(320, false), listing(300, false), listing(1, true)]
            },
            "5057": { "itemID": 5057, "listings": [listing(40, false), listing(45, false)] }
        }
    });
    let high = json!({
        "items": {
            "1601": { "itemID": 1601, "hqSaleVelocity": 1.5, "listings": [listing(600, false)] },
            "5057": { "itemID": 5057, "listings": [listing(70, false)] }
        }
    });

    Mock::given(method("GET"))
        .and(path("/Japan/2,1601,5057"))
        .and(query_param("hq", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(normal))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Japan/1601,5057"))
        .and(query_param("hq", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(high))
        .expect(1)
        .mount(&server)
        .await;

    let (_file, catalog) = catalog();
    let report = check_recipe(
        &catalog,
        &client(&server),
        "Japan",
        &StatsConfig::default(),
        1601,
    )
    .await
    .unwrap();

    assert_eq!(report.scope, "Japan");
    assert_eq!(report.items[&5057].name, "Iron Ingot");

    let sword = &report.market[&1601];
    assert_eq!(sword[&Quality::Normal].min_price, Some(300));
    assert_eq!(sword[&Quality::Normal].total_listing_count, 2);
    assert_eq!(sword[&Quality::High].min_price, Some(600));
    assert!(!report.market[&2].contains_key(&Quality::High));

    let summary = &report.summary;
    assert_eq!(summary.lines.len(), 2);
    assert_eq!(summary.lines[0].chosen_source, PriceSource::NormalQuality);
    assert_eq!(summary.lines[0].line_total, 120);
    assert_eq!(summary.lines[1].line_total, 20);
    assert_eq!(summary.total_craft_cost, 140);
    assert_eq!(summary.baseline.total, 300);
    assert_eq!(summary.profit, 160);
    assert_eq!(summary.sale_velocity, 3.5);
    assert_eq!(summary.margin_status(), ProfitIndicatorStatus::Healthy);

    // Shop beats the 70 gil HQ ingot.
    assert_eq!(report.high_quality_summary.total_craft_cost, 170);

    let text = render_text(&report);
    assert!(text.contains("Iron Longsword (1601)"));
    assert!(text.contains("High-quality materials"));

    let encoded = serde_json::to_value(&report).unwrap();
    assert_eq!(encoded["summary"]["total_craft_cost"], 140);
}

#[tokio::test]
async fn unknown_recipe_is_not_found_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (_file, catalog) = catalog();
    let error = check_recipe(&catalog, &client(&server), "Japan", &StatsConfig::default(), 42)
        .await
        .unwrap_err();

    assert_eq!(error, CraftError::NotFound { result_id: 42 });
}

#[tokio::test]
async fn failed_fetch_is_upstream_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let (_file, catalog) = catalog();
    let error = check_recipe(&catalog, &client(&server), "Japan", &StatsConfig::default(), 1601)
        .await
        .unwrap_err();

    assert!(matches!(error, CraftError::UpstreamUnavailable { .. }));
    assert!(!error.is_insufficient_data());
}

#[tokio::test]
async fn ingredient_without_any_price_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("hq", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": {
                "1602": { "itemID": 1602, "listings": [listing(500, false)] },
                "9999": { "itemID": 9999, "listings": [listing(5, true)] }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("hq", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": {} })))
        .mount(&server)
        .await;

    let (_file, catalog) = catalog();
    let error = check_recipe(&catalog, &client(&server), "Japan", &StatsConfig::default(), 1602)
        .await
        .unwrap_err();

    assert_eq!(error, CraftError::UnpricedIngredient { item_id: 9999 });
    assert!(error.is_insufficient_data());
}
