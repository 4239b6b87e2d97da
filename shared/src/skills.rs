use std::collections::HashMap;

use crate::{Skill, SkillInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillRatingUpdate {
    pub skill_id: i32,
    pub rating: i32,
}

/// Writes needed to fold incoming ratings into a user's skill set.
///
/// Skills that are not mentioned never show up here, which is what keeps
/// the merge from behaving like a replace-all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillMergePlan {
    pub updates: Vec<SkillRatingUpdate>,
    pub inserts: Vec<SkillInput>,
}

impl SkillMergePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty()
    }
}

/// Plans a merge keyed by skill name. When a name repeats in `incoming` the
/// last rating wins; existing skills keep their id and only get a new rating.
pub fn plan_skill_merge(existing: &[Skill], incoming: &[SkillInput]) -> SkillMergePlan {
    let by_name: HashMap<&str, &Skill> = existing.iter().map(|s| (s.skill.as_str(), s)).collect();

    // first-seen order, last-seen rating
    let mut order: Vec<&str> = Vec::new();
    let mut latest: HashMap<&str, i32> = HashMap::new();
    for input in incoming {
        let name = input.skill.as_str();
        if latest.insert(name, input.rating).is_none() {
            order.push(name);
        }
    }

    let mut plan = SkillMergePlan::default();
    for name in order {
        let rating = latest[name];
        match by_name.get(name) {
            Some(current) if current.rating == rating => {}
            Some(current) => plan.updates.push(SkillRatingUpdate {
                skill_id: current.id,
                rating,
            }),
            None => plan.inserts.push(SkillInput {
                skill: name.to_string(),
                rating,
            }),
        }
    }

    plan
}
