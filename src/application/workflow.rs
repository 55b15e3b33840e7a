use crate::domain::actor::Actor;
use crate::domain::class::{Class, ClassContent, ClassFilter, NewClass};
use crate::domain::id::ObjectId;
use crate::domain::ports::{
    ClassStoreBox, DeleteResult, InsertOutcome, TeacherRequestStoreBox, UpdateResult, UserKey,
    UserStoreBox,
};
use crate::domain::status::ApprovalStatus;
use crate::domain::teacher_request::{NewTeacherRequest, TeacherRequest};
use crate::domain::user::{NewUser, Role, User, normalize_email};
use crate::error::{Result, WorkflowError};
use serde::Serialize;
use tracing::{error, info, warn};

/// Both halves of a teacher approval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeacherApproval {
    pub request: UpdateResult,
    pub user: UpdateResult,
}

/// Decides which state transitions are legal for users, teacher requests and
/// classes, and applies them through the store ports.
///
/// Every operation is one request/response unit. Apart from `approve_teacher`,
/// no operation touches more than one collection, and none of them is
/// transactional across documents.
pub struct WorkflowEngine {
    users: UserStoreBox,
    teacher_requests: TeacherRequestStoreBox,
    classes: ClassStoreBox,
}

impl WorkflowEngine {
    pub fn new(
        users: UserStoreBox,
        teacher_requests: TeacherRequestStoreBox,
        classes: ClassStoreBox,
    ) -> Self {
        Self {
            users,
            teacher_requests,
            classes,
        }
    }

    // ---- users ----

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.users.find_all().await
    }

    /// Absent users are `Ok(None)`, never an error.
    pub async fn find_user(&self, email: &str) -> Result<Option<User>> {
        self.users
            .find_one(&UserKey::Email(email.trim().to_string()))
            .await
    }

    /// Registers a user unless one with the same email already exists, in
    /// which case the stored record is returned untouched.
    pub async fn register_user(&self, new_user: NewUser) -> Result<InsertOutcome<User>> {
        let user = User::register(new_user)?;
        let outcome = self.users.insert_if_absent(user).await?;
        match &outcome {
            InsertOutcome::Inserted(user) => info!(email = %user.email, "user registered"),
            InsertOutcome::Existing(user) => {
                info!(email = %user.email, "registration skipped, user exists")
            }
        }
        Ok(outcome)
    }

    pub async fn promote_to_teacher(&self, email: &str) -> Result<UpdateResult> {
        let key = UserKey::Email(normalize_email(email)?);
        self.apply_role(&key, Role::Teacher).await
    }

    /// Sets an arbitrary role on the user with id `user_id`.
    pub async fn set_role(&self, user_id: &str, role: &str) -> Result<UpdateResult> {
        let id: ObjectId = user_id.parse()?;
        let role: Role = role.parse()?;
        self.apply_role(&UserKey::Id(id), role).await
    }

    async fn apply_role(&self, key: &UserKey, role: Role) -> Result<UpdateResult> {
        let result = self.users.set_role(key, role).await?;
        if result.is_unmatched() {
            warn!(user = %key, %role, "role change matched no user");
            return Err(WorkflowError::not_found("user", key));
        }
        info!(user = %key, %role, modified = result.modified_count, "role set");
        Ok(result)
    }

    /// Resolves the caller of an ownership-checked operation. The role always
    /// comes from the stored user.
    pub async fn resolve_actor(&self, email: &str) -> Result<Actor> {
        match self.find_user(email).await? {
            Some(user) => Ok(Actor::from(&user)),
            None => Err(WorkflowError::forbidden(format!(
                "'{}' is not a registered user",
                email.trim()
            ))),
        }
    }

    // ---- teacher requests ----

    pub async fn list_teacher_requests(&self) -> Result<Vec<TeacherRequest>> {
        self.teacher_requests.find_all().await
    }

    pub async fn submit_teacher_request(
        &self,
        new_request: NewTeacherRequest,
    ) -> Result<TeacherRequest> {
        let request = TeacherRequest::submit(new_request)?;
        match self.teacher_requests.insert_unless_pending(request).await? {
            InsertOutcome::Inserted(request) => {
                info!(email = %request.email, id = %request.id, "teacher request submitted");
                Ok(request)
            }
            InsertOutcome::Existing(pending) => Err(WorkflowError::conflict(format!(
                "A teacher request for '{}' is already pending",
                pending.email
            ))),
        }
    }

    /// Sets the status of the latest request for `email`. The user's role is
    /// left alone.
    pub async fn decide_teacher_request(&self, email: &str, status: &str) -> Result<UpdateResult> {
        let status: ApprovalStatus = status.parse()?;
        let request = self.latest_request(email).await?;
        self.transition_request(&request, status).await
    }

    /// Accepts the latest request for `email` and promotes the user.
    ///
    /// The two writes are separate; if the promotion fails the request status
    /// is put back to what it was before and the promotion error is returned.
    pub async fn approve_teacher(&self, email: &str) -> Result<TeacherApproval> {
        let request = self.latest_request(email).await?;
        let previous = request.status;
        let request_result = self
            .transition_request(&request, ApprovalStatus::Accepted)
            .await?;

        match self.promote_to_teacher(&request.email).await {
            Ok(user_result) => Ok(TeacherApproval {
                request: request_result,
                user: user_result,
            }),
            Err(e) => {
                if request_result.modified_count == 0 {
                    // Already accepted before this call; nothing of ours to undo
                    return Err(e);
                }
                warn!(email = %request.email, error = %e, "promotion failed, restoring request status");
                let undo = self
                    .teacher_requests
                    .set_status_if(request.id, ApprovalStatus::Accepted, previous)
                    .await;
                if let Err(undo) = undo {
                    error!(
                        email = %request.email,
                        error = %undo,
                        "could not restore teacher request status"
                    );
                }
                Err(e)
            }
        }
    }

    async fn latest_request(&self, email: &str) -> Result<TeacherRequest> {
        let email = normalize_email(email)?;
        self.teacher_requests
            .find_latest(&email)
            .await?
            .ok_or_else(|| WorkflowError::not_found("teacher request", &email))
    }

    async fn transition_request(
        &self,
        request: &TeacherRequest,
        status: ApprovalStatus,
    ) -> Result<UpdateResult> {
        if !request.status.can_transition_to(status) {
            warn!(email = %request.email, from = %request.status, to = %status, "illegal request transition");
            return Err(WorkflowError::conflict(format!(
                "Teacher request for '{}' is already {}",
                request.email, request.status
            )));
        }
        let result = self
            .teacher_requests
            .set_status_if(request.id, request.status, status)
            .await?;
        if !result.is_unmatched() {
            info!(email = %request.email, %status, "teacher request decided");
            return Ok(result);
        }

        // Decided by someone else since it was read
        match self.teacher_requests.find_latest(&request.email).await? {
            Some(current) if current.id == request.id && current.status == status => {
                Ok(UpdateResult::matched(false))
            }
            Some(current) if current.id == request.id => {
                warn!(email = %request.email, from = %current.status, to = %status, "teacher request decided concurrently");
                Err(WorkflowError::conflict(format!(
                    "Teacher request for '{}' is already {}",
                    request.email, current.status
                )))
            }
            _ => Err(WorkflowError::not_found("teacher request", &request.email)),
        }
    }

    // ---- classes ----

    pub async fn submit_class(&self, new_class: NewClass) -> Result<Class> {
        let class = Class::submit(new_class)?;
        self.classes.insert(class.clone()).await?;
        info!(id = %class.id, owner = %class.email, "class submitted");
        Ok(class)
    }

    pub async fn decide_class(&self, class_id: &str, status: &str) -> Result<UpdateResult> {
        let id: ObjectId = class_id.parse()?;
        let status: ApprovalStatus = status.parse()?;
        let class = self
            .classes
            .find_one(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("class", id))?;

        if !class.status.can_transition_to(status) {
            warn!(%id, from = %class.status, to = %status, "illegal class transition");
            return Err(WorkflowError::conflict(format!(
                "Class {id} is already {}",
                class.status
            )));
        }

        let result = self.classes.set_status_if(id, class.status, status).await?;
        if !result.is_unmatched() {
            info!(%id, %status, "class decided");
            return Ok(result);
        }

        // Decided or deleted since it was read
        match self.classes.find_one(id).await? {
            Some(current) if current.status == status => Ok(UpdateResult::matched(false)),
            Some(current) => {
                warn!(%id, from = %current.status, to = %status, "class decided concurrently");
                Err(WorkflowError::conflict(format!(
                    "Class {id} is already {}",
                    current.status
                )))
            }
            None => Err(WorkflowError::not_found("class", id)),
        }
    }

    /// Every class regardless of status.
    pub async fn list_classes(&self) -> Result<Vec<Class>> {
        self.classes.find(&ClassFilter::All).await
    }

    /// The student-facing listing: accepted classes only.
    pub async fn list_accepted_classes(&self) -> Result<Vec<Class>> {
        self.classes
            .find(&ClassFilter::Status(ApprovalStatus::Accepted))
            .await
    }

    pub async fn list_classes_by_teacher(&self, email: &str) -> Result<Vec<Class>> {
        self.classes
            .find(&ClassFilter::Owner(email.trim().to_string()))
            .await
    }

    pub async fn fetch_class(&self, class_id: &str) -> Result<Option<Class>> {
        let id: ObjectId = class_id.parse()?;
        self.classes.find_one(id).await
    }

    /// Overwrites {title, name, email, price, image}; status is never touched.
    /// A missing class is created under `class_id`.
    pub async fn edit_class(
        &self,
        actor: &Actor,
        class_id: &str,
        mut content: ClassContent,
    ) -> Result<UpdateResult> {
        let id: ObjectId = class_id.parse()?;
        content.email = normalize_email(&content.email)?;

        let owner = match self.classes.find_one(id).await? {
            Some(existing) => existing.email,
            None => content.email.clone(),
        };
        if !actor.may_manage(&owner) {
            warn!(%id, actor = %actor.email, "class edit refused");
            return Err(WorkflowError::forbidden(format!(
                "'{}' may not edit class {id}",
                actor.email
            )));
        }
        if owner != content.email && !actor.is_admin() {
            return Err(WorkflowError::forbidden(
                "Only an admin may transfer a class to another instructor",
            ));
        }

        let result = self.classes.upsert_content(id, content).await?;
        info!(%id, actor = %actor.email, upserted = result.upserted_id.is_some(), "class edited");
        Ok(result)
    }

    pub async fn delete_class(&self, actor: &Actor, class_id: &str) -> Result<DeleteResult> {
        let id: ObjectId = class_id.parse()?;
        let class = self
            .classes
            .find_one(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("class", id))?;
        if !actor.may_manage(&class.email) {
            warn!(%id, actor = %actor.email, "class delete refused");
            return Err(WorkflowError::forbidden(format!(
                "'{}' may not delete class {id}",
                actor.email
            )));
        }

        let result = self.classes.delete(id).await?;
        info!(%id, actor = %actor.email, "class deleted");
        Ok(result)
    }
}
