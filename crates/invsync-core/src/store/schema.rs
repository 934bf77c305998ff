// Table definitions. Identifiers are hyphenated UUID text, structured
// columns are JSON text, timestamps are RFC 3339 text in UTC.

pub(super) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS data_source (
    data_source_id TEXT PRIMARY KEY,
    name           TEXT NOT NULL UNIQUE,
    generation_id  INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS resource_pool (
    resource_pool_id   TEXT PRIMARY KEY,
    global_location_id TEXT NOT NULL,
    name               TEXT NOT NULL,
    description        TEXT NOT NULL,
    o_cloud_id         TEXT NOT NULL,
    location           TEXT,
    o_cloud_site_id    TEXT,
    extensions         TEXT,
    data_source_id     TEXT NOT NULL,
    generation_id      INTEGER NOT NULL,
    external_id        TEXT NOT NULL,
    created_at         TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE INDEX IF NOT EXISTS resource_pool_generation
    ON resource_pool (data_source_id, generation_id);

CREATE TABLE IF NOT EXISTS resource_type (
    resource_type_id TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    description      TEXT NOT NULL,
    vendor           TEXT NOT NULL,
    model            TEXT NOT NULL,
    version          TEXT NOT NULL,
    resource_kind    TEXT NOT NULL,
    resource_class   TEXT NOT NULL,
    extensions       TEXT,
    data_source_id   TEXT NOT NULL,
    generation_id    INTEGER NOT NULL,
    created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE INDEX IF NOT EXISTS resource_type_generation
    ON resource_type (data_source_id, generation_id);

CREATE TABLE IF NOT EXISTS resource (
    resource_id      TEXT PRIMARY KEY,
    resource_type_id TEXT NOT NULL,
    resource_pool_id TEXT NOT NULL,
    global_asset_id  TEXT,
    description      TEXT NOT NULL,
    extensions       TEXT,
    resource_groups  TEXT,
    tags             TEXT,
    data_source_id   TEXT NOT NULL,
    generation_id    INTEGER NOT NULL,
    external_id      TEXT NOT NULL,
    created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE INDEX IF NOT EXISTS resource_generation
    ON resource (data_source_id, generation_id);

CREATE TABLE IF NOT EXISTS deployment_manager (
    deployment_manager_id TEXT PRIMARY KEY,
    name                  TEXT NOT NULL,
    description           TEXT NOT NULL,
    o_cloud_id            TEXT NOT NULL,
    url                   TEXT NOT NULL,
    locations             TEXT,
    capabilities          TEXT,
    capacity_info         TEXT,
    extensions            TEXT,
    data_source_id        TEXT NOT NULL,
    generation_id         INTEGER NOT NULL,
    external_id           TEXT NOT NULL,
    created_at            TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE INDEX IF NOT EXISTS deployment_manager_generation
    ON deployment_manager (data_source_id, generation_id);

CREATE TABLE IF NOT EXISTS location (
    location_id        TEXT PRIMARY KEY,
    global_location_id TEXT NOT NULL UNIQUE,
    name               TEXT NOT NULL,
    description        TEXT NOT NULL,
    coordinate         TEXT,
    civic_address      TEXT,
    address            TEXT,
    extensions         TEXT,
    data_source_id     TEXT NOT NULL,
    generation_id      INTEGER NOT NULL,
    external_id        TEXT NOT NULL,
    created_at         TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE INDEX IF NOT EXISTS location_generation
    ON location (data_source_id, generation_id);

CREATE TABLE IF NOT EXISTS o_cloud_site (
    o_cloud_site_id    TEXT PRIMARY KEY,
    global_location_id TEXT NOT NULL,
    name               TEXT NOT NULL,
    description        TEXT NOT NULL,
    extensions         TEXT,
    data_source_id     TEXT NOT NULL,
    generation_id      INTEGER NOT NULL,
    external_id        TEXT NOT NULL,
    created_at         TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE INDEX IF NOT EXISTS o_cloud_site_generation
    ON o_cloud_site (data_source_id, generation_id);

CREATE TABLE IF NOT EXISTS data_change_event (
    sequence_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    data_change_id TEXT NOT NULL UNIQUE,
    object_type    TEXT NOT NULL,
    object_id      TEXT NOT NULL,
    parent_id      TEXT,
    before_state   TEXT,
    after_state    TEXT,
    created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
";
