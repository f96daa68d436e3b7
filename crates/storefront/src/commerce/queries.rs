//! GraphQL documents for the commerce platform.
//!
//! Hand-written, matching the platform's published schema. Response shapes
//! live next to the client methods that execute them.

/// Fetch a checkout with its lines and totals.
pub const CHECKOUT: &str = r"
    query checkout($id: ID!) {
        checkout(id: $id) {
            id
            email
            status
            lines {
                id
                variantId
                title
                quantity
                unitPrice { amount currency }
                totalPrice { amount currency }
            }
            subtotal { amount currency }
            total { amount currency }
        }
    }
";

/// Create a checkout, optionally with initial lines.
pub const CHECKOUT_CREATE: &str = r"
    mutation checkoutCreate($email: String, $lines: [CheckoutLineInput!]) {
        checkoutCreate(email: $email, lines: $lines) {
            checkout {
                id
                email
                status
                lines {
                    id
                    variantId
                    title
                    quantity
                    unitPrice { amount currency }
                    totalPrice { amount currency }
                }
                subtotal { amount currency }
                total { amount currency }
            }
            errors { field message }
        }
    }
";

/// Add lines to an existing checkout.
pub const CHECKOUT_LINES_ADD: &str = r"
    mutation checkoutLinesAdd($id: ID!, $lines: [CheckoutLineInput!]!) {
        checkoutLinesAdd(id: $id, lines: $lines) {
            checkout {
                id
                email
                status
                lines {
                    id
                    variantId
                    title
                    quantity
                    unitPrice { amount currency }
                    totalPrice { amount currency }
                }
                subtotal { amount currency }
                total { amount currency }
            }
            errors { field message }
        }
    }
";

/// Initialize a payment transaction against a checkout.
pub const TRANSACTION_INITIALIZE: &str = r"
    mutation transactionInitialize($checkoutId: ID!, $gateway: String!) {
        transactionInitialize(checkoutId: $checkoutId, gateway: $gateway) {
            transaction { transactionId data }
            errors { field message }
        }
    }
";

/// Complete a checkout into an order, referencing its transaction.
pub const CHECKOUT_COMPLETE: &str = r"
    mutation checkoutComplete($checkoutId: ID!, $transactionId: ID!) {
        checkoutComplete(checkoutId: $checkoutId, transactionId: $transactionId) {
            order {
                id
                number
                status
                total { amount currency }
                createdAt
            }
            errors { field message }
        }
    }
";

/// Fetch an order by ID.
pub const ORDER: &str = r"
    query order($id: ID!) {
        order(id: $id) {
            id
            number
            status
            total { amount currency }
            createdAt
        }
    }
";

/// Fetch the signed-in customer.
pub const ME: &str = r"
    query me {
        me {
            id
            email
            firstName
            lastName
        }
    }
";

/// Fetch the signed-in customer's most recent orders.
pub const MY_ORDERS: &str = r"
    query myOrders($first: Int!) {
        me {
            orders(first: $first) {
                edges {
                    node {
                        id
                        number
                        status
                        total { amount currency }
                        createdAt
                    }
                }
            }
        }
    }
";

/// Sign in: mint a token pair from credentials.
pub const TOKEN_CREATE: &str = r"
    mutation tokenCreate($email: String!, $password: String!) {
        tokenCreate(email: $email, password: $password) {
            accessToken
            refreshToken
            expiresIn
            refreshExpiresIn
            customer { id email firstName lastName }
            errors { field message }
        }
    }
";

/// Rotate the pair using a refresh token.
pub const TOKEN_REFRESH: &str = r"
    mutation tokenRefresh($refreshToken: String!) {
        tokenRefresh(refreshToken: $refreshToken) {
            accessToken
            refreshToken
            expiresIn
            refreshExpiresIn
            errors { field message }
        }
    }
";

/// Invalidate the pair server-side on sign-out.
pub const TOKEN_DEACTIVATE: &str = r"
    mutation tokenDeactivate($refreshToken: String!) {
        tokenDeactivate(refreshToken: $refreshToken) {
            errors { field message }
        }
    }
";
