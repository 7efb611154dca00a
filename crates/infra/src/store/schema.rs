//! Relational schema, applied by [`super::PostgresStore::migrate`].
//!
//! Statements are idempotent so `migrate` can run on every boot.

pub(super) const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL CHECK (length(btrim(name)) > 0),
        local_name  TEXT,
        category    TEXT NOT NULL CHECK (length(btrim(category)) > 0),
        price       NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
        discount    NUMERIC(5, 4) NOT NULL DEFAULT 0 CHECK (discount BETWEEN 0 AND 1),
        season      TEXT NOT NULL DEFAULT 'ALL' CHECK (season IN ('ALL', 'SUMMER', 'WINTER')),
        is_active   BOOLEAN NOT NULL DEFAULT TRUE,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS products_category_name_idx ON products (category, name)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory (
        product_id       UUID PRIMARY KEY REFERENCES products (id),
        stock_available  BIGINT NOT NULL CHECK (stock_available >= 0),
        updated_at       TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        email       TEXT NOT NULL,
        phone       TEXT,
        created_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS customers_email_key ON customers (lower(email))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cart_lines (
        id           UUID PRIMARY KEY,
        customer_id  UUID NOT NULL REFERENCES customers (id),
        product_id   UUID NOT NULL REFERENCES products (id),
        quantity     BIGINT NOT NULL CHECK (quantity > 0 AND quantity <= 4294967295),
        added_at     TIMESTAMPTZ NOT NULL,
        UNIQUE (customer_id, product_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id              UUID PRIMARY KEY,
        customer_id     UUID NOT NULL REFERENCES customers (id),
        status          TEXT NOT NULL CHECK (status IN ('PENDING', 'CONFIRMED', 'SHIPPED', 'DELIVERED', 'CANCELLED')),
        payment_method  TEXT NOT NULL,
        total_amount    NUMERIC(31, 2) NOT NULL CHECK (total_amount >= 0),
        version         BIGINT NOT NULL CHECK (version > 0),
        created_at      TIMESTAMPTZ NOT NULL,
        updated_at      TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS orders_customer_created_idx ON orders (customer_id, created_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_items (
        order_id      UUID NOT NULL REFERENCES orders (id),
        line_no       INTEGER NOT NULL CHECK (line_no > 0),
        product_id    UUID NOT NULL REFERENCES products (id),
        product_name  TEXT NOT NULL,
        quantity      BIGINT NOT NULL CHECK (quantity > 0),
        unit_price    NUMERIC(12, 2) NOT NULL CHECK (unit_price >= 0),
        PRIMARY KEY (order_id, line_no)
    )
    "#,
];
