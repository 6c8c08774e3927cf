use serde::Serialize;
use std::collections::HashMap;

use crate::types::{Participant, ParticipantType, Side};

/// One participant whose aggregate is touched when an entry or matchUp side
/// names some (possibly composite) participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevantParticipant {
    pub relevant_participant_id: String,
    pub participant_type: ParticipantType,
}

impl RelevantParticipant {
    fn new(id: &str, participant_type: ParticipantType) -> Self {
        RelevantParticipant {
            relevant_participant_id: id.to_string(),
            participant_type,
        }
    }
}

/// Read-only map from participant id to its relevance set, built once per query.
#[derive(Debug, Default, Clone)]
pub struct RelevantParticipantIds {
    map: HashMap<String, Vec<RelevantParticipant>>,
}

impl RelevantParticipantIds {
    /// Individual members first, tagged INDIVIDUAL, then the participant itself
    /// tagged with its own type.
    pub fn build(participants: &[Participant]) -> Self {
        let mut map = HashMap::with_capacity(participants.len());
        for participant in participants {
            let mut relevant: Vec<RelevantParticipant> = participant
                .individual_participant_ids
                .iter()
                .map(|id| RelevantParticipant::new(id, ParticipantType::Individual))
                .collect();
            relevant.push(RelevantParticipant::new(
                &participant.participant_id,
                participant.participant_type,
            ));
            map.insert(participant.participant_id.clone(), relevant);
        }
        RelevantParticipantIds { map }
    }

    pub fn get(&self, participant_id: &str) -> Option<&[RelevantParticipant]> {
        self.map.get(participant_id).map(|relevant| relevant.as_slice())
    }

    /// Relevance set for an entry-level id. Unknown ids resolve to nothing.
    pub fn for_participant(&self, participant_id: &str) -> Vec<RelevantParticipant> {
        self.get(participant_id).map(|relevant| relevant.to_vec()).unwrap_or_default()
    }

    /// Relevance set for a matchUp side. Pairs formed from team lineUps carry
    /// their members on the side itself and may be absent from the participant
    /// list, so side membership takes precedence over the static map.
    pub fn for_side(&self, side: &Side) -> Vec<RelevantParticipant> {
        let Some(participant_id) = side.participant_id.as_deref() else {
            return Vec::new();
        };
        if side.individual_participant_ids.is_empty() {
            return self.get(participant_id).map(|relevant| relevant.to_vec()).unwrap_or_else(|| {
                vec![RelevantParticipant::new(participant_id, ParticipantType::Individual)]
            });
        }
        let own_type = self
            .get(participant_id)
            .and_then(|relevant| relevant.last())
            .map(|own| own.participant_type)
            .unwrap_or(ParticipantType::Pair);
        let mut relevant: Vec<RelevantParticipant> = side
            .individual_participant_ids
            .iter()
            .map(|id| RelevantParticipant::new(id, ParticipantType::Individual))
            .collect();
        relevant.push(RelevantParticipant::new(participant_id, own_type));
        relevant
    }

    /// Every relevant id reachable from the given entry-level ids.
    pub fn expand<'a, I>(&self, participant_ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = Vec::new();
        for participant_id in participant_ids {
            for relevant in self.get(participant_id).unwrap_or(&[]) {
                if !out.contains(&relevant.relevant_participant_id) {
                    out.push(relevant.relevant_participant_id.clone());
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
