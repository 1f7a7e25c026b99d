use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use storeconf_cloud::Method;
use storeconf_sync::{diff_extensions, ExtensionAction, SyncError};

fn list(value: Value) -> Vec<Value> {
    value.as_array().cloned().unwrap()
}

#[test]
fn identical_members_produce_no_actions() {
    let members = list(json!([{"zone": "eu", "price": 5}, {"zone": "us", "price": 9}]));
    assert!(diff_extensions("zone", &members, &members).unwrap().is_empty());
}

#[test]
fn reordering_is_not_a_change() {
    let desired = list(json!([{"zone": "us"}, {"zone": "eu"}]));
    let previous = list(json!([{"zone": "eu"}, {"zone": "us"}]));
    assert!(diff_extensions("zone", &desired, &previous).unwrap().is_empty());
}

#[test]
fn removes_then_updates_then_adds() {
    let desired = list(json!([
        {"zone": "asia", "price": 12},
        {"zone": "us", "price": 10},
        {"zone": "uk", "price": 7, "note": null},
    ]));
    let previous = list(json!([
        {"zone": "eu", "price": 5},
        {"zone": "us", "price": 9, "note": "legacy"},
    ]));

    let actions = diff_extensions("zone", &desired, &previous).unwrap();
    assert_eq!(
        actions,
        vec![
            ExtensionAction::Remove { key: "eu".into() },
            ExtensionAction::Update {
                key: "us".into(),
                changes: json!({"note": null, "price": 10}).as_object().cloned().unwrap(),
            },
            ExtensionAction::Add {
                body: json!({"zone": "asia", "price": 12}),
            },
            ExtensionAction::Add {
                body: json!({"zone": "uk", "price": 7}),
            },
        ]
    );
    assert_eq!(actions[2].key("zone"), Some("asia"));
    assert_eq!(actions[0].key("zone"), Some("eu"));
}

#[test]
fn duplicate_keys_are_rejected() {
    let desired = list(json!([{"zone": "eu"}, {"zone": "eu"}]));
    let err = diff_extensions("zone", &desired, &[]).unwrap_err();
    assert!(matches!(err, SyncError::InvariantViolation(_)));
}

#[test]
fn members_without_a_key_are_rejected() {
    let desired = list(json!([{"price": 1}]));
    let err = diff_extensions("zone", &desired, &[]).unwrap_err();
    assert!(err.to_string().contains("zone"));
}

#[test]
fn requests_target_the_extension_collection() {
    let parent = "shop/shipping-methods/m1";

    let add = ExtensionAction::Add {
        body: json!({"zone": "eu"}),
    }
    .request(parent, "zone-rates");
    assert_eq!(add.method, Method::Post);
    assert_eq!(add.path, "shop/shipping-methods/m1/zone-rates");
    assert_eq!(add.body, Some(json!({"zone": "eu"})));

    let update = ExtensionAction::Update {
        key: "north america".into(),
        changes: json!({"price": 3}).as_object().cloned().unwrap(),
    }
    .request(parent, "zone-rates");
    assert_eq!(update.method, Method::Patch);
    assert_eq!(update.path, "shop/shipping-methods/m1/zone-rates/north%20america");

    let remove = ExtensionAction::Remove { key: "eu".into() }.request(parent, "zone-rates");
    assert_eq!(remove.method, Method::Delete);
    assert_eq!(remove.path, "shop/shipping-methods/m1/zone-rates/eu");
    assert_eq!(remove.body, None);
}
