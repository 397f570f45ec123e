use std::sync::Arc;
use std::time::Duration;

use shiftcache_core::cache::{derive_key, CacheClient, MemoryCache, ReadSource};
use shiftcache_core::{QuerySpec, RecordStore, ShiftService, ShiftStatus};
use tempfile::TempDir;

fn shift_json(id: &str, name: &str, start: &str, status: &str) -> String {
    format!(
        r#"{{"id":"{id}","caregiver_name":"{name}","role":"ST","start_time":"{start}","end_time":"2030-01-01T00:00:00Z","status":"{status}","created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}}"#
    )
}

fn setup() -> (TempDir, Arc<MemoryCache>, ShiftService) {
    let shifts = [
        shift_json("s1", "Dana Reyes", "2024-05-02T09:00:00Z", "PENDING"),
        shift_json("s2", "Eli Park", "2024-05-01T09:00:00Z", "PENDING"),
        shift_json("s3", "Dana Moss", "2024-05-01T09:00:00Z", "DECLINED"),
        shift_json("s4", "Finn Hale", "2024-05-03T07:30:00Z", "PENDING"),
    ];
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shifts.json");
    std::fs::write(&path, format!(r#"{{"shifts":[{}]}}"#, shifts.join(","))).unwrap();

    let cache = Arc::new(MemoryCache::new());
    let service = ShiftService::new(RecordStore::new(path), cache.clone(), Duration::from_secs(300));
    (dir, cache, service)
}

#[tokio::test]
async fn read_write_read_cycle() {
    let (_dir, cache, service) = setup();
    let dana = QuerySpec::new().with_caregiver("DANA");

    let first = service.get_shifts(&dana).await.unwrap();
    assert_eq!(first.source, ReadSource::Source);
    let ids: Vec<_> = first.data.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s3", "s1"]);
    service.shutdown().await;

    // Blank and differently cased queries hit the same entries
    let again = service
        .get_shifts(&QuerySpec::from_params([("caregiver", " dana ")]))
        .await
        .unwrap();
    assert_eq!(again.source, ReadSource::Cache);
    assert_eq!(again.data, first.data);

    let all = service.get_shifts(&QuerySpec::new().with_caregiver("")).await.unwrap();
    assert_eq!(all.source, ReadSource::Source);
    // Equal start times keep file order
    let ids: Vec<_> = all.data.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s2", "s3", "s1", "s4"]);
    service.shutdown().await;
    assert_eq!(cache.keys().len(), 2);

    let ids = vec!["s1".to_string(), "s4".to_string(), "ghost".to_string()];
    let batch = service
        .batch_update_shifts(&ids, ShiftStatus::Confirmed, Some("admin_9"))
        .await;
    assert!(batch.success);
    assert_eq!(batch.updated, Some(2));
    assert_eq!(batch.not_found, Some(vec!["ghost".to_string()]));
    assert_eq!(service.store().write_count(), 1);
    assert!(cache.keys().is_empty());

    let after = service.get_shifts(&dana).await.unwrap();
    assert_eq!(after.source, ReadSource::Source);
    let s1 = after.data.iter().find(|s| s.id == "s1").unwrap();
    assert_eq!(s1.status, ShiftStatus::Confirmed);
    assert_eq!(s1.updated_by.as_deref(), Some("admin_9"));

    let pending = service
        .get_shifts(&QuerySpec::new().with_status(ShiftStatus::Pending))
        .await
        .unwrap();
    let ids: Vec<_> = pending.data.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s2"]);
}

#[tokio::test]
async fn rejected_writes_leave_file_and_cache_alone() {
    let (dir, cache, service) = setup();
    service.get_shifts(&QuerySpec::new()).await.unwrap();
    service.shutdown().await;
    let before = std::fs::read_to_string(dir.path().join("shifts.json")).unwrap();

    let declined_again = service
        .update_shift_status("s3", ShiftStatus::Declined, None)
        .await;
    assert!(!declined_again.success);
    assert!(declined_again.error.unwrap().contains("s3"));

    let none = service
        .batch_update_shifts(&["x".to_string(), "y".to_string()], ShiftStatus::Declined, None)
        .await;
    assert!(!none.success);

    assert_eq!(service.store().write_count(), 0);
    assert_eq!(std::fs::read_to_string(dir.path().join("shifts.json")).unwrap(), before);
    assert!(cache.get(&derive_key(&QuerySpec::new())).await.unwrap().is_some());
}

#[tokio::test]
async fn written_file_stays_loadable() {
    let (dir, _cache, service) = setup();
    let result = service
        .update_shift_status("s2", ShiftStatus::Declined, Some("admin_2"))
        .await;
    assert!(result.success);

    let contents = std::fs::read_to_string(dir.path().join("shifts.json")).unwrap();
    // Pretty-printed, with the shifts array at the top level
    assert!(contents.starts_with("{\n  \"shifts\": ["));

    let reloaded = RecordStore::new(dir.path().join("shifts.json")).load().await.unwrap();
    assert_eq!(reloaded.len(), 4);
    assert_eq!(reloaded[1].status, ShiftStatus::Declined);
}
