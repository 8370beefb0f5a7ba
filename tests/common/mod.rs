//! Shared fixtures: a small accounts service with three path seeds and the
//! filesystem image its paths point into.

#![allow(dead_code)]

use std::collections::BTreeSet;

use pathscope::prelude::*;

pub const SERVICE: &str =
    "<com.android.server.accounts.AccountManagerService: void removeAccount(java.lang.String)>";
pub const HELPER: &str =
    "<com.android.server.accounts.AccountManagerService: java.io.File getDatabaseDir()>";
pub const USER_ID: &str = "<android.os.UserHandle: int getCallingUserId()>";
pub const CACHE_FIELD: &str =
    "<com.android.server.accounts.AccountManagerService: java.io.File mCacheDir>";

pub const GET_ACCOUNTS: &str = "android.permission.GET_ACCOUNTS";
pub const MANAGE_USERS: &str = "android.permission.MANAGE_USERS";

pub fn site(method: &str, stmt: u32) -> CallSite {
    CallSite::new(method, stmt)
}

pub fn arg(method: &str, stmt: u32, index: u32) -> PlaceholderKey {
    PlaceholderKey::Argument {
        site: site(method, stmt),
        index,
    }
}

pub fn ret(method: &str) -> PlaceholderKey {
    PlaceholderKey::Return {
        method: MethodId::new(method),
    }
}

pub fn text(value: &str) -> Operand {
    Operand::Constant(Constant::string(value))
}

/// The database seed: `new File(getDatabaseDir(), "accounts.db")` where the
/// directory is `"/data/system_de/" + getCallingUserId()`.
pub fn database_seed() -> Seed {
    Seed::new(arg(SERVICE, 7, 0))
}

/// A listing of a directory read from a field nobody writes.
pub fn cache_listing_seed() -> Seed {
    Seed::listing(arg(SERVICE, 9, 0))
}

/// `new File(System.getenv("ANDROID_DATA"), "misc/wifi/WifiConfigStore.xml")`.
pub fn wifi_seed() -> Seed {
    Seed::new(arg(SERVICE, 11, 0))
}

pub fn facts() -> SnapshotFacts {
    let mut facts = SnapshotFacts::new();
    facts.set_reachable(
        SERVICE,
        BTreeSet::from([MethodId::new(SERVICE), MethodId::new(HELPER)]),
    );
    facts.mark_bodiless(USER_ID);

    facts.add_definition(
        database_seed().key,
        Definition::new(
            SERVICE,
            6,
            ValueShape::PathJoin {
                parent: Operand::Placeholder(ret(HELPER)),
                child: text("accounts.db"),
            },
        ),
    );
    facts.add_definition(
        ret(HELPER),
        Definition::new(
            HELPER,
            3,
            ValueShape::Concat {
                alternatives: vec![vec![
                    text("/data/system_de/"),
                    Operand::Placeholder(arg(HELPER, 2, 0)),
                ]],
            },
        ),
    );
    facts.add_definition(
        arg(HELPER, 2, 0),
        Definition::new(
            HELPER,
            1,
            ValueShape::CallReturn {
                site: site(HELPER, 1),
            },
        ),
    );
    facts.add_call(site(HELPER, 1), USER_ID);
    facts.add_call(site(SERVICE, 5), HELPER);

    facts.add_definition(
        cache_listing_seed().key,
        Definition::new(
            SERVICE,
            8,
            ValueShape::FieldRead {
                field: CACHE_FIELD.to_string(),
            },
        ),
    );

    facts.add_definition(
        wifi_seed().key,
        Definition::new(
            SERVICE,
            11,
            ValueShape::PathJoin {
                parent: Operand::Placeholder(arg(SERVICE, 10, 0)),
                child: text("misc/wifi/WifiConfigStore.xml"),
            },
        ),
    );
    facts.add_definition(
        arg(SERVICE, 10, 0),
        Definition::new(
            SERVICE,
            10,
            ValueShape::EnvLookup {
                name: text("ANDROID_DATA"),
            },
        ),
    );

    facts
}

pub fn entry_point() -> EntryPoint {
    EntryPoint::new(SERVICE, "android.accounts.IAccountManager$Stub").with_permission(GET_ACCOUNTS)
}

pub fn inputs() -> Vec<EntryPointSeeds> {
    vec![EntryPointSeeds {
        entry_point: entry_point(),
        seeds: vec![database_seed(), cache_listing_seed(), wifi_seed()],
    }]
}

pub fn ownership() -> SnapshotOwnership {
    let mut db = SnapshotOwnership::new();
    db.add_entry(FileEntry::new("/data/system_de/0/accounts.db", "system", "system"));
    db.add_entry(FileEntry::new("/data/misc/wifi/WifiConfigStore.xml", "wifi", "wifi"));
    db.add_entry(FileEntry::new("/data/system/packages.xml", "system", "system"));
    db.add_owner(
        Owner::new("system", true)
            .with_permission(GET_ACCOUNTS)
            .with_permission(MANAGE_USERS)
            .with_file("/data/system_de/0/accounts.db")
            .with_file("/data/system/packages.xml"),
    );
    db.add_owner(Owner::new("wifi", true).with_file("/data/misc/wifi/WifiConfigStore.xml"));
    db
}
