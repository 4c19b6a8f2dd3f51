pub use self::push::{
    BrowserSubscription, DeleteResponse, PermissionState, SubscriptionDelete,
    SubscriptionKeys, SubscriptionPrune, SubscriptionUpsert, UserQuery,
    AUTH_SECRET_LENGTH, P256DH_LENGTH,
};

mod push;
