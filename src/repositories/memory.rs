//! In-memory store backing the service tests. Mirrors the conditional
//! updates of the PostgreSQL repositories so lifecycle guards behave the
//! same way.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::activity::ActivityRepository;
use super::badges::BadgeRepository;
use super::groups::GroupRepository;
use super::notifications::NotificationRepository;
use super::personal_rides::PersonalRideRepository;
use super::planning::PlanningRepository;
use super::rides::RideRepository;
use super::users::UserRepository;
use crate::models::activity::{ActionType, ActivityEntry};
use crate::models::badges::{UserBadge, UserStats};
use crate::models::groups::{
    Group, GroupMember, GroupSummary, MemberRole, MemberStatus, NewGroup,
};
use crate::models::notifications::NotificationPreferences;
use crate::models::personal_rides::{NewPersonalRide, PersonalRide, PersonalRideQuery, PersonalRideStatus};
use crate::models::planning::{EventWindow, NewPlanningEvent, PlanningEvent};
use crate::models::rides::{
    ClaimOutcome, MyRidesKind, NewRide, Ride, RideFilter, RideStatus, RideVisibility,
};
use crate::models::users::{
    CreditKind, CreditTransaction, User, VerificationRequest, VerificationReview,
    VerificationStatus,
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    credit_transactions: Vec<CreditTransaction>,
    rides: Vec<Ride>,
    user_badges: Vec<UserBadge>,
    groups: Vec<Group>,
    members: Vec<GroupMember>,
    events: Vec<PlanningEvent>,
    personal_rides: Vec<PersonalRide>,
    preferences: HashMap<String, NotificationPreferences>,
    activity: Vec<ActivityEntry>,
}

impl Tables {
    fn apply_credit(
        &mut self,
        user_id: &str,
        delta: i64,
        kind: CreditKind,
        ride_id: Option<&str>,
    ) -> Result<i64, anyhow::Error> {
        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| anyhow!("User not found: {}", user_id))?;
        user.credits += delta;
        user.updated_at = Utc::now();
        let credits = user.credits;

        self.credit_transactions.push(CreditTransaction {
            id: new_id(),
            user_id: user_id.to_string(),
            amount: delta,
            kind,
            ride_id: ride_id.map(str::to_string),
            created_at: Utc::now(),
        });

        Ok(credits)
    }
}

fn new_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Operations that can be made to fail to exercise best-effort paths.
#[derive(Default)]
struct Faults {
    expiry: AtomicBool,
    stats: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, id: &str, email: &str, credits: i64) -> User {
        let now = Utc::now();
        let user = User {
            id: id.to_string(),
            email: email.to_string(),
            full_name: None,
            phone: None,
            siren: None,
            professional_card_number: None,
            credits,
            verification_status: VerificationStatus::Unverified,
            verification_submitted_at: None,
            rejection_reason: None,
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .users
            .insert(id.to_string(), user.clone());
        user
    }

    pub fn fail_expiry(&self) {
        self.faults.expiry.store(true, Ordering::SeqCst);
    }

    pub fn fail_stats(&self) {
        self.faults.stats.store(true, Ordering::SeqCst);
    }

    pub async fn set_admin(&self, id: &str) {
        if let Some(user) = self.tables.write().await.users.get_mut(id) {
            user.is_admin = true;
        }
    }

    pub async fn set_credits(&self, id: &str, credits: i64) {
        if let Some(user) = self.tables.write().await.users.get_mut(id) {
            user.credits = credits;
        }
    }

    pub async fn credits(&self, id: &str) -> Option<i64> {
        self.tables.read().await.users.get(id).map(|u| u.credits)
    }

    pub async fn ride(&self, id: &str) -> Option<Ride> {
        self.tables
            .read()
            .await
            .rides
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Moves a ride's schedule, bypassing lifecycle rules.
    pub async fn reschedule_ride(&self, id: &str, scheduled_at: DateTime<Utc>) {
        if let Some(ride) = self
            .tables
            .write()
            .await
            .rides
            .iter_mut()
            .find(|r| r.id == id)
        {
            ride.scheduled_at = scheduled_at;
        }
    }

    pub async fn award_count(&self, user_id: &str, badge_id: &str) -> usize {
        self.tables
            .read()
            .await
            .user_badges
            .iter()
            .filter(|b| b.user_id == user_id && b.badge_id == badge_id)
            .count()
    }

    pub async fn set_member_status(&self, group_id: &str, email: &str, status: MemberStatus) {
        if let Some(member) = self
            .tables
            .write()
            .await
            .members
            .iter_mut()
            .find(|m| m.group_id == group_id && m.email == email)
        {
            member.status = status;
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, anyhow::Error> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn ensure_user(
        &self,
        id: &str,
        email: &str,
        starting_credits: i64,
    ) -> Result<(User, bool), anyhow::Error> {
        if let Some(user) = self.get_user(id).await? {
            return Ok((user, false));
        }
        Ok((self.insert_user(id, email, starting_credits).await, true))
    }

    async fn adjust_credits(
        &self,
        user_id: &str,
        delta: i64,
        kind: CreditKind,
        ride_id: Option<&str>,
    ) -> Result<i64, anyhow::Error> {
        self.tables
            .write()
            .await
            .apply_credit(user_id, delta, kind, ride_id)
    }

    async fn credit_history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<CreditTransaction>, anyhow::Error> {
        Ok(self
            .tables
            .read()
            .await
            .credit_transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn submit_verification(
        &self,
        user_id: &str,
        request: &VerificationRequest,
    ) -> Result<User, anyhow::Error> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(user_id)
            .ok_or_else(|| anyhow!("User not found: {}", user_id))?;

        user.full_name = Some(request.full_name.clone());
        user.phone = Some(request.phone.clone());
        user.siren = Some(request.siren.clone());
        user.professional_card_number = Some(request.professional_card_number.clone());
        if let Some(email) = &request.email {
            user.email = email.clone();
        }
        user.verification_status = VerificationStatus::Pending;
        user.verification_submitted_at = Some(Utc::now());
        user.rejection_reason = None;

        Ok(user.clone())
    }

    async fn pending_verifications(&self) -> Result<Vec<User>, anyhow::Error> {
        let mut pending: Vec<User> = self
            .tables
            .read()
            .await
            .users
            .values()
            .filter(|u| u.verification_status == VerificationStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|u| u.verification_submitted_at);
        Ok(pending)
    }

    async fn review_verification(
        &self,
        user_id: &str,
        review: &VerificationReview,
    ) -> Result<User, anyhow::Error> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(user_id)
            .ok_or_else(|| anyhow!("User not found: {}", user_id))?;

        user.verification_status = review.status;
        user.rejection_reason = review.rejection_reason.clone();

        Ok(user.clone())
    }
}

#[async_trait]
impl RideRepository for MemoryStore {
    async fn insert_ride(
        &self,
        creator_id: &str,
        ride: &NewRide,
        publish_credit: i64,
    ) -> Result<Ride, anyhow::Error> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let stored = Ride {
            id: new_id(),
            creator_id: creator_id.to_string(),
            picker_id: None,
            pickup_address: ride.pickup_address.clone(),
            dropoff_address: ride.dropoff_address.clone(),
            scheduled_at: ride.scheduled_at,
            price_cents: ride.price_cents,
            status: RideStatus::Published,
            visibility: ride.visibility,
            vehicle_type: ride.vehicle_type.clone(),
            distance_km: ride.distance_km,
            duration_minutes: ride.duration_minutes,
            commission_enabled: ride.commission_enabled,
            group_id: ride.group_id.clone(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        if publish_credit > 0 {
            tables.apply_credit(
                creator_id,
                publish_credit,
                CreditKind::PublishRide,
                Some(&stored.id),
            )?;
        }
        tables.rides.push(stored.clone());

        Ok(stored)
    }

    async fn get_ride(&self, id: &str) -> Result<Option<Ride>, anyhow::Error> {
        Ok(self.ride(id).await)
    }

    async fn list_rides(
        &self,
        viewer_id: &str,
        filter: &RideFilter,
        limit: i64,
    ) -> Result<Vec<Ride>, anyhow::Error> {
        let mut rides: Vec<Ride> = self
            .tables
            .read()
            .await
            .rides
            .iter()
            .filter(|r| r.visibility != RideVisibility::Personal || r.creator_id == viewer_id)
            .filter(|r| match filter.status {
                Some(status) => r.status == status,
                None => r.status != RideStatus::Expired,
            })
            .filter(|r| filter.visibility.map_or(true, |v| r.visibility == v))
            .filter(|r| {
                filter
                    .group_id
                    .as_ref()
                    .map_or(true, |g| r.group_id.as_ref() == Some(g))
            })
            .cloned()
            .collect();

        rides.sort_by_key(|r| r.scheduled_at);
        Ok(rides
            .into_iter()
            .skip(filter.skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn my_rides(&self, user_id: &str, kind: MyRidesKind) -> Result<Vec<Ride>, anyhow::Error> {
        let mut rides: Vec<Ride> = self
            .tables
            .read()
            .await
            .rides
            .iter()
            .filter(|r| match kind {
                MyRidesKind::Claimed => r.picker_id.as_deref() == Some(user_id),
                MyRidesKind::Published => r.creator_id == user_id,
            })
            .cloned()
            .collect();

        rides.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        Ok(rides)
    }

    async fn expire_past_rides(&self, now: DateTime<Utc>) -> Result<u64, anyhow::Error> {
        if self.faults.expiry.load(Ordering::SeqCst) {
            return Err(anyhow!("ride expiry unavailable"));
        }
        let mut expired = 0;
        for ride in self.tables.write().await.rides.iter_mut() {
            if ride.status == RideStatus::Published && ride.scheduled_at < now {
                ride.status = RideStatus::Expired;
                ride.updated_at = Utc::now();
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn claim_ride(
        &self,
        ride_id: &str,
        picker_id: &str,
        cost: i64,
    ) -> Result<ClaimOutcome, anyhow::Error> {
        let mut tables = self.tables.write().await;

        let balance = tables.users.get(picker_id).map_or(0, |u| u.credits);
        if balance < cost {
            return Ok(ClaimOutcome::InsufficientCredits);
        }

        let Some(position) = tables.rides.iter().position(|r| {
            r.id == ride_id && r.status == RideStatus::Published && r.creator_id != picker_id
        }) else {
            return Ok(ClaimOutcome::RideUnavailable);
        };

        let credits = tables.apply_credit(picker_id, -cost, CreditKind::ClaimRide, Some(ride_id))?;
        let ride = &mut tables.rides[position];
        ride.picker_id = Some(picker_id.to_string());
        ride.status = RideStatus::Claimed;
        ride.updated_at = Utc::now();

        Ok(ClaimOutcome::Claimed {
            ride: ride.clone(),
            credits,
        })
    }

    async fn complete_ride(
        &self,
        ride_id: &str,
        picker_id: &str,
        bonus: i64,
    ) -> Result<Option<Ride>, anyhow::Error> {
        let mut tables = self.tables.write().await;

        let Some(position) = tables.rides.iter().position(|r| {
            r.id == ride_id
                && r.status == RideStatus::Claimed
                && r.picker_id.as_deref() == Some(picker_id)
        }) else {
            return Ok(None);
        };

        let now = Utc::now();
        let ride = &mut tables.rides[position];
        ride.status = RideStatus::Completed;
        ride.completed_at = Some(now);
        ride.updated_at = now;
        let ride = ride.clone();

        if bonus > 0 {
            tables.apply_credit(
                &ride.creator_id,
                bonus,
                CreditKind::CompleteRideBonus,
                Some(ride_id),
            )?;
        }

        Ok(Some(ride))
    }

    async fn delete_ride(&self, ride_id: &str, creator_id: &str) -> Result<bool, anyhow::Error> {
        let mut tables = self.tables.write().await;
        let before = tables.rides.len();
        tables
            .rides
            .retain(|r| !(r.id == ride_id && r.creator_id == creator_id));
        Ok(tables.rides.len() < before)
    }
}

#[async_trait]
impl BadgeRepository for MemoryStore {
    async fn user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, anyhow::Error> {
        Ok(self
            .tables
            .read()
            .await
            .user_badges
            .iter()
            .rev()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn award_badge(&self, user_id: &str, badge_id: &str) -> Result<bool, anyhow::Error> {
        let mut tables = self.tables.write().await;
        if tables
            .user_badges
            .iter()
            .any(|b| b.user_id == user_id && b.badge_id == badge_id)
        {
            return Ok(false);
        }

        tables.user_badges.push(UserBadge {
            user_id: user_id.to_string(),
            badge_id: badge_id.to_string(),
            earned_at: Utc::now(),
        });
        Ok(true)
    }

    async fn user_stats(&self, user_id: &str) -> Result<UserStats, anyhow::Error> {
        if self.faults.stats.load(Ordering::SeqCst) {
            return Err(anyhow!("user statistics unavailable"));
        }
        let tables = self.tables.read().await;
        let published = tables.rides.iter().filter(|r| r.creator_id == user_id).count();
        let completed_as_picker = tables
            .rides
            .iter()
            .filter(|r| {
                r.picker_id.as_deref() == Some(user_id) && r.status == RideStatus::Completed
            })
            .count();

        Ok(UserStats {
            published: published as i64,
            completed_as_picker: completed_as_picker as i64,
            credits: tables.users.get(user_id).map_or(0, |u| u.credits),
        })
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn create_group(
        &self,
        owner_id: &str,
        owner_email: &str,
        group: &NewGroup,
    ) -> Result<Group, anyhow::Error> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let stored = Group {
            id: new_id(),
            owner_id: owner_id.to_string(),
            name: group.name.clone(),
            description: group.description.clone(),
            icon: group.icon.clone(),
            created_at: now,
        };

        tables.members.push(GroupMember {
            id: new_id(),
            group_id: stored.id.clone(),
            user_id: Some(owner_id.to_string()),
            email: owner_email.to_string(),
            role: MemberRole::Admin,
            status: MemberStatus::Active,
            invited_by: None,
            created_at: now,
            updated_at: now,
        });
        tables.groups.push(stored.clone());

        Ok(stored)
    }

    async fn get_group(&self, id: &str) -> Result<Option<Group>, anyhow::Error> {
        Ok(self
            .tables
            .read()
            .await
            .groups
            .iter()
            .find(|g| g.id == id)
            .cloned())
    }

    async fn groups_for_user(&self, user_id: &str) -> Result<Vec<GroupSummary>, anyhow::Error> {
        let tables = self.tables.read().await;
        let summaries = tables
            .groups
            .iter()
            .rev()
            .filter_map(|group| {
                let membership = tables.members.iter().find(|m| {
                    m.group_id == group.id
                        && m.user_id.as_deref() == Some(user_id)
                        && m.status == MemberStatus::Active
                })?;
                let member_count = tables
                    .members
                    .iter()
                    .filter(|m| m.group_id == group.id && m.status == MemberStatus::Active)
                    .count();

                Some(GroupSummary {
                    group: group.clone(),
                    member_count: member_count as i64,
                    role: membership.role,
                })
            })
            .collect();

        Ok(summaries)
    }

    async fn members(&self, group_id: &str) -> Result<Vec<GroupMember>, anyhow::Error> {
        Ok(self
            .tables
            .read()
            .await
            .members
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<GroupMember>, anyhow::Error> {
        Ok(self
            .tables
            .read()
            .await
            .members
            .iter()
            .find(|m| m.group_id == group_id && m.user_id.as_deref() == Some(user_id))
            .cloned())
    }

    async fn membership_by_email(
        &self,
        group_id: &str,
        email: &str,
    ) -> Result<Option<GroupMember>, anyhow::Error> {
        Ok(self
            .tables
            .read()
            .await
            .members
            .iter()
            .find(|m| m.group_id == group_id && m.email == email)
            .cloned())
    }

    async fn upsert_invitation(
        &self,
        group_id: &str,
        email: &str,
        user_id: Option<&str>,
        invited_by: &str,
    ) -> Result<Option<GroupMember>, anyhow::Error> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(existing) = tables
            .members
            .iter_mut()
            .find(|m| m.group_id == group_id && m.email == email)
        {
            if existing.status.blocks_invitation() {
                return Ok(None);
            }
            existing.status = MemberStatus::Pending;
            existing.role = MemberRole::Member;
            if let Some(user_id) = user_id {
                existing.user_id = Some(user_id.to_string());
            }
            existing.invited_by = Some(invited_by.to_string());
            existing.updated_at = now;
            return Ok(Some(existing.clone()));
        }

        let member = GroupMember {
            id: new_id(),
            group_id: group_id.to_string(),
            user_id: user_id.map(str::to_string),
            email: email.to_string(),
            role: MemberRole::Member,
            status: MemberStatus::Pending,
            invited_by: Some(invited_by.to_string()),
            created_at: now,
            updated_at: now,
        };
        tables.members.push(member.clone());

        Ok(Some(member))
    }

    async fn link_invitations(&self, email: &str, user_id: &str) -> Result<u64, anyhow::Error> {
        let mut linked = 0;
        for member in self.tables.write().await.members.iter_mut() {
            if member.email == email && member.user_id.is_none() {
                member.user_id = Some(user_id.to_string());
                linked += 1;
            }
        }
        Ok(linked)
    }
}

#[async_trait]
impl PlanningRepository for MemoryStore {
    async fn list_events(
        &self,
        driver_id: &str,
        window: &EventWindow,
    ) -> Result<Vec<PlanningEvent>, anyhow::Error> {
        let mut events: Vec<PlanningEvent> = self
            .tables
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.driver_id == driver_id)
            .filter(|e| window.start_date.map_or(true, |start| e.start_time >= start))
            .filter(|e| window.end_date.map_or(true, |end| e.end_time <= end))
            .cloned()
            .collect();

        events.sort_by_key(|e| e.start_time);
        Ok(events)
    }

    async fn get_event(&self, id: &str) -> Result<Option<PlanningEvent>, anyhow::Error> {
        Ok(self
            .tables
            .read()
            .await
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn active_events_between(
        &self,
        driver_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PlanningEvent>, anyhow::Error> {
        let mut events: Vec<PlanningEvent> = self
            .tables
            .read()
            .await
            .events
            .iter()
            .filter(|e| {
                e.driver_id == driver_id
                    && e.status.is_active()
                    && e.start_time < end
                    && start < e.end_time
            })
            .cloned()
            .collect();

        events.sort_by_key(|e| e.start_time);
        Ok(events)
    }

    async fn insert_event(
        &self,
        driver_id: &str,
        event: &NewPlanningEvent,
    ) -> Result<PlanningEvent, anyhow::Error> {
        let now = Utc::now();
        let stored = PlanningEvent {
            id: new_id(),
            driver_id: driver_id.to_string(),
            event_type: event.event_type,
            title: event.title.clone(),
            notes: event.notes.clone(),
            location: event.location.clone(),
            ride_source: event.ride_source.clone(),
            personal_ride_id: event.personal_ride_id.clone(),
            start_time: event.start_time,
            end_time: event.end_time,
            status: event.status,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.events.push(stored.clone());

        Ok(stored)
    }

    async fn update_event(&self, event: &PlanningEvent) -> Result<PlanningEvent, anyhow::Error> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .events
            .iter_mut()
            .find(|e| e.id == event.id && e.driver_id == event.driver_id)
            .ok_or_else(|| anyhow!("Planning event not found: {}", event.id))?;

        *stored = PlanningEvent {
            updated_at: Utc::now(),
            ..event.clone()
        };

        Ok(stored.clone())
    }

    async fn delete_event(&self, id: &str, driver_id: &str) -> Result<bool, anyhow::Error> {
        let mut tables = self.tables.write().await;
        let before = tables.events.len();
        tables
            .events
            .retain(|e| !(e.id == id && e.driver_id == driver_id));
        Ok(tables.events.len() < before)
    }
}

#[async_trait]
impl PersonalRideRepository for MemoryStore {
    async fn list(
        &self,
        driver_id: &str,
        query: &PersonalRideQuery,
    ) -> Result<Vec<PersonalRide>, anyhow::Error> {
        let rides = self
            .tables
            .read()
            .await
            .personal_rides
            .iter()
            .rev()
            .filter(|r| r.driver_id == driver_id)
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .take(query.limit.map_or(usize::MAX, |l| l as usize))
            .cloned()
            .collect();

        Ok(rides)
    }

    async fn get(&self, id: &str) -> Result<Option<PersonalRide>, anyhow::Error> {
        Ok(self
            .tables
            .read()
            .await
            .personal_rides
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn insert(
        &self,
        driver_id: &str,
        ride: &NewPersonalRide,
    ) -> Result<PersonalRide, anyhow::Error> {
        let now = Utc::now();
        let stored = PersonalRide {
            id: new_id(),
            driver_id: driver_id.to_string(),
            source: ride.source,
            pickup_address: ride.pickup_address.clone(),
            dropoff_address: ride.dropoff_address.clone(),
            scheduled_at: ride.scheduled_at,
            price_cents: ride.price_cents,
            distance_km: ride.distance_km,
            duration_minutes: ride.duration_minutes,
            client_name: ride.client_name.clone(),
            client_phone: ride.client_phone.clone(),
            notes: ride.notes.clone(),
            status: ride.status,
            created_at: now,
            updated_at: now,
            completed_at: (ride.status == PersonalRideStatus::Completed).then_some(now),
        };
        self.tables.write().await.personal_rides.push(stored.clone());

        Ok(stored)
    }

    async fn update(&self, ride: &PersonalRide) -> Result<PersonalRide, anyhow::Error> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .personal_rides
            .iter_mut()
            .find(|r| r.id == ride.id && r.driver_id == ride.driver_id)
            .ok_or_else(|| anyhow!("Personal ride not found: {}", ride.id))?;

        *stored = PersonalRide {
            updated_at: Utc::now(),
            ..ride.clone()
        };

        Ok(stored.clone())
    }

    async fn delete(&self, id: &str, driver_id: &str) -> Result<bool, anyhow::Error> {
        let mut tables = self.tables.write().await;
        let before = tables.personal_rides.len();
        tables
            .personal_rides
            .retain(|r| !(r.id == id && r.driver_id == driver_id));
        Ok(tables.personal_rides.len() < before)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn get_preferences(
        &self,
        user_id: &str,
    ) -> Result<Option<NotificationPreferences>, anyhow::Error> {
        Ok(self.tables.read().await.preferences.get(user_id).cloned())
    }

    async fn save_preferences(
        &self,
        user_id: &str,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences, anyhow::Error> {
        self.tables
            .write()
            .await
            .preferences
            .insert(user_id.to_string(), prefs.clone());
        Ok(prefs.clone())
    }
}

#[async_trait]
impl ActivityRepository for MemoryStore {
    async fn record(
        &self,
        user_id: &str,
        action_type: ActionType,
        description: &str,
        ride_id: Option<&str>,
    ) -> Result<(), anyhow::Error> {
        self.tables.write().await.activity.push(ActivityEntry {
            id: new_id(),
            user_id: user_id.to_string(),
            action_type,
            description: description.to_string(),
            ride_id: ride_id.map(str::to_string),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: i64) -> Result<Vec<ActivityEntry>, anyhow::Error> {
        Ok(self
            .tables
            .read()
            .await
            .activity
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
