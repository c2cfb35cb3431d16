#[cfg(test)]
mod session_persistence_tests {
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use studyflow::config::AppConfig;
    use studyflow::repository::{database::init_database, Repository, SessionPersistence};
    use studyflow::services::AuthStore;
    use studyflow::test_helpers::mint_token;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> (AuthStore, Repository) {
        let pool = init_database(&dir.path().join("data").join("session.db")).await.unwrap();
        let repository = Repository::new(pool);
        let store = AuthStore::new(Arc::new(repository.sessions.clone()));
        store.hydrate().await;
        (store, repository)
    }

    #[tokio::test]
    async fn test_session_survives_restart() {
        let dir = TempDir::new().unwrap();
        let token = mint_token("asha", Some(1), Utc::now() + Duration::hours(3));

        {
            let (store, _) = open_store(&dir).await;
            assert!(!store.is_logged_in());
            assert!(store.set_token(Some(&token)).await);
            store.record_pomodoro_session().await;
        }

        let (restored, _) = open_store(&dir).await;
        assert!(restored.is_hydrated());
        assert_eq!(restored.token(), Some(token));
        assert_eq!(restored.user().map(|u| u.username), Some("asha".to_string()));
        assert_eq!(restored.active_sessions(), 1);
    }

    #[tokio::test]
    async fn test_logout_is_durable() {
        let dir = TempDir::new().unwrap();
        let token = mint_token("asha", Some(1), Utc::now() + Duration::hours(3));

        {
            let (store, _) = open_store(&dir).await;
            store.set_token(Some(&token)).await;
            assert!(store.logout().await);
        }

        let (restored, repository) = open_store(&dir).await;
        assert!(!restored.is_logged_in());
        let record = repository.sessions.load().await.unwrap().unwrap_or_default();
        assert!(record.token.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_discarded_on_restore() {
        let dir = TempDir::new().unwrap();

        {
            let (_, repository) = open_store(&dir).await;
            let stale = studyflow::domain::session::PersistedSession {
                token: Some(mint_token("asha", Some(1), Utc::now() - Duration::hours(1))),
                username: Some("asha".to_string()),
                user_id: Some(1),
                expires_at: Some(Utc::now() - Duration::hours(1)),
                active_sessions: 4,
            };
            repository.sessions.save(&stale).await.unwrap();
        }

        let (restored, repository) = open_store(&dir).await;
        assert!(restored.is_hydrated());
        assert!(!restored.is_logged_in());
        assert_eq!(restored.active_sessions(), 4);

        let record = repository.sessions.load().await.unwrap().unwrap_or_default();
        assert!(record.token.is_none());
        assert_eq!(record.active_sessions, 4);
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("studyflow").join("config.toml");

        let created = AppConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.login_route, "/login");

        let mut edited = created.clone();
        edited.api_base_url = "https://study.example.org/api".to_string();
        edited.pomodoro.focus_minutes = 50;
        edited.database_path = Some(dir.path().join("custom.db"));
        edited.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url, "https://study.example.org/api");
        assert_eq!(loaded.pomodoro.focus_seconds(), 3000);
        assert_eq!(loaded.resolve_database_path().unwrap(), dir.path().join("custom.db"));
    }
}
