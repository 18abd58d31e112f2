mod redacted_token;
