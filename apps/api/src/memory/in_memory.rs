use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::memory::{
    CandidateEvent, CandidateProfile, FinalDecision, MemoryError, MemoryStore, RoleProfile,
};

#[derive(Default)]
pub struct InMemoryMemoryStore {
    profiles: Mutex<HashMap<Uuid, CandidateProfile>>,
    events: Mutex<Vec<CandidateEvent>>,
    roles: Mutex<HashMap<String, RoleProfile>>,
    finals: Mutex<HashMap<(Uuid, String), FinalDecision>>,
}

impl InMemoryMemoryStore {
    pub fn events_for(&self, candidate_id: Uuid) -> Vec<CandidateEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.candidate_id == candidate_id)
            .cloned()
            .collect()
    }

    pub fn final_decisions(&self) -> Vec<FinalDecision> {
        self.finals.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn candidate_profile(
        &self,
        candidate_id: Uuid,
    ) -> Result<Option<CandidateProfile>, MemoryError> {
        Ok(self.profiles.lock().unwrap().get(&candidate_id).cloned())
    }

    async fn recent_events(
        &self,
        candidate_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CandidateEvent>, MemoryError> {
        let mut events = self.events_for(candidate_id);
        events.reverse();
        events.truncate(limit.max(0) as usize);
        Ok(events)
    }

    async fn role_profile(&self, role: &str) -> Result<Option<RoleProfile>, MemoryError> {
        Ok(self.roles.lock().unwrap().get(role).cloned())
    }

    async fn upsert_candidate_profile(&self, profile: &CandidateProfile) -> Result<(), MemoryError> {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.candidate_id, profile.clone());
        Ok(())
    }

    async fn record_event(&self, event: &CandidateEvent) -> Result<(), MemoryError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn upsert_role_profile(&self, profile: &RoleProfile) -> Result<(), MemoryError> {
        self.roles
            .lock()
            .unwrap()
            .insert(profile.role.clone(), profile.clone());
        Ok(())
    }

    async fn upsert_final_decision(&self, decision: &FinalDecision) -> Result<(), MemoryError> {
        self.finals.lock().unwrap().insert(
            (decision.candidate_id, decision.role.clone()),
            decision.clone(),
        );
        Ok(())
    }
}
