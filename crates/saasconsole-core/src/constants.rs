//! Table layout and domain constants
//!
//! Every row lives in one table. Rows are told apart by a `Type` attribute and by
//! the prefix of their composite keys.

/// Maximum number of write requests sent in one batch call.
pub const BATCH_LIMIT: usize = 25;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Largest page size a client may request.
pub const MAX_PAGE_LIMIT: usize = 100;

// Key prefixes
pub const PREFIX_USER: &str = "USER#";
pub const PREFIX_COMPANY: &str = "COMPANY#";
pub const PREFIX_ROLE: &str = "ROLE#";
pub const PREFIX_GROUP: &str = "GROUP#";
pub const PREFIX_DEPARTMENT: &str = "DEPARTMENT#";
pub const PREFIX_LOG: &str = "LOG#";
pub const PREFIX_NOTIFICATION: &str = "NOTIFICATION#";
pub const PREFIX_ROLE_REQUEST: &str = "ROLE_REQUEST#";
pub const PREFIX_INTEGRATION: &str = "INTEGRATION#";
pub const PREFIX_JOB: &str = "JOB#";

// Attribute names shared by the store and the repositories
pub const ATTR_PK: &str = "PK";
pub const ATTR_SK: &str = "SK";
pub const ATTR_GSI_SK: &str = "GSI_SK";
pub const ATTR_TYPE: &str = "Type";
pub const ATTR_STATUS: &str = "Status";
pub const ATTR_PREVIOUS_STATUS: &str = "PreviousStatus";
pub const ATTR_COMPANY_ID: &str = "CompanyID";
pub const ATTR_CREATED_AT: &str = "CreatedAt";
pub const ATTR_UPDATED_AT: &str = "UpdatedAt";
pub const ATTR_SEARCH_KEY: &str = "SearchKey";
pub const ATTR_EMAIL: &str = "Email";

// Entity types stored in the `Type` attribute
pub const ENTITY_TYPE_USER: &str = "USER";
pub const ENTITY_TYPE_COMPANY: &str = "COMPANY";
pub const ENTITY_TYPE_COMPANY_MEMBER: &str = "COMPANYMEMBER";
pub const ENTITY_TYPE_ROLE: &str = "ROLE";
pub const ENTITY_TYPE_USER_ROLE: &str = "USERROLE";
pub const ENTITY_TYPE_GROUP: &str = "GROUP";
pub const ENTITY_TYPE_GROUP_MEMBER: &str = "GROUPMEMBER";
pub const ENTITY_TYPE_DEPARTMENT: &str = "DEPARTMENT";
pub const ENTITY_TYPE_DEPARTMENT_MEMBER: &str = "DEPARTMENTMEMBER";
pub const ENTITY_TYPE_LOG: &str = "LOG";
pub const ENTITY_TYPE_NOTIFICATION: &str = "NOTIFICATION";
pub const ENTITY_TYPE_ROLE_REQUEST: &str = "ROLEREQUEST";
pub const ENTITY_TYPE_COMPANY_INTEGRATION: &str = "COMPANYINTEGRATION";
pub const ENTITY_TYPE_JOB: &str = "JOB";
pub const ENTITY_TYPE_CRON_JOB: &str = "CRONJOB";

// Secondary index names
pub const INDEX_INVERTED: &str = "InvertedIndex";
pub const INDEX_GET_USERS: &str = "GetUsers";
pub const INDEX_GET_ROLES: &str = "GetRoles";
pub const INDEX_GET_LOGS: &str = "GetLogs";

// Premade roles. They are not stored; every company implicitly has them.
pub const ROLE_ID_COMPANY_ADMIN: &str = "52e62ee3-a0db-4e32-b1ba-3b932ffd8f5e";
pub const ROLE_ID_DEPARTMENT_ADMIN: &str = "0094b3ec-48e9-4679-bbf5-ddd6cc374c27";
pub const ROLE_ID_GROUP_ADMIN: &str = "86737da9-27c5-4636-a301-fc73613ea27a";
pub const ROLE_NAME_COMPANY_ADMIN: &str = "company admin";
pub const ROLE_NAME_DEPARTMENT_ADMIN: &str = "department admin";
pub const ROLE_NAME_GROUP_ADMIN: &str = "group admin";
pub const ROLE_NAME_GROUP_MEMBER: &str = "group member";

/// Names no custom role may take, compared case-insensitively.
pub const PREMADE_ROLE_NAMES: [&str; 4] = [
    ROLE_NAME_COMPANY_ADMIN,
    ROLE_NAME_DEPARTMENT_ADMIN,
    ROLE_NAME_GROUP_ADMIN,
    ROLE_NAME_GROUP_MEMBER,
];

/// Token stored on users created without an invitation.
pub const DEFAULT_USER_TOKEN: &str = "DEFAULT_USER";

/// Setup wizard status once the owner has finished or skipped it.
pub const WIZARD_STATUS_DONE: &str = "DONE";

// Job types
pub const JOB_GROUP_MEMBERS: &str = "GROUP_MEMBERS";
pub const JOB_DELETE_ACCOUNT_SUFFIX: &str = "_ACCOUNT";

// Notification types
pub const NOTIFICATION_REQUEST_COMPANY_ROLE_UPDATE: &str = "REQUEST_COMPANY_ROLE_UPDATE";
pub const NOTIFICATION_REQUEST_COMPANY_ROLE_ACCEPT: &str = "REQUEST_COMPANY_ROLE_ACCEPT";
pub const NOTIFICATION_ROLE_UPDATE: &str = "ROLE_UPDATE";
