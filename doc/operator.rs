//=====================================================================================================================

Operator:

The operator agent (off-chain) calls 5 methods across 4 contracts

// DelegationManager (core): registration state and core registration
- function isOperator(address operator) external view returns (bool)
- function registerAsOperator(OperatorDetails calldata registeringOperatorDetails, string calldata metadataURI) external
    - struct OperatorDetails { address earningsReceiver; address delegationApprover; uint32 stakerOptOutWindowBlocks; }


// AVSDirectory (core): digest the operator signs for AVS registration
- function calculateOperatorAVSRegistrationDigestHash(address operator, address avs, bytes32 salt, uint256 expiry) external view returns (bytes32)


// ECDSAStakeRegistry (avs): AVS registration
- function registerOperatorWithSignature(SignatureWithSaltAndExpiry memory _operatorSignature, address _signingKey) external
    - struct SignatureWithSaltAndExpiry { bytes signature; bytes32 salt; uint256 expiry; }


// CrowdFunding service manager (avs): donations and the task feed
- function donateToTask(uint32 taskIndex) external payable
- event NewTaskCreated(uint32 indexed taskIndex, Task task)
    - struct Task { string name; uint256 goalAmount; uint256 duration; uint32 taskCreatedBlock; }


//=====================================================================================================================

Main thread:

Purpose: register once, then donate to every new task.

    1> Load `.env`, parse options (RPC_URL, PRIVATE_KEY, CHAIN_ID, DEPLOYMENTS_DIR, ABI_DIR).
        - Derive the operator address from PRIVATE_KEY.
        - Read `hello-world/{chainId}.json` (helloWorldServiceManager, stakeRegistry)
          and `core/{chainId}.json` (delegation, avsDirectory).

    2> Verify chain info thru Web3 API.
        - Fetch chain ID and height, make sure chain ID matches CHAIN_ID (default 31337).
        Example: "chain_id:31337, block_num:42, operator:0xf39f...2266"

    3> Register operator.
        - `isOperator(self)` is true: log and skip everything below.
        - `registerAsOperator({self, 0x0, 0}, "")`, wait for the receipt.
        - Random 32 byte salt, expiry = now + 3600.
        - Fetch digest thru `calculateOperatorAVSRegistrationDigestHash(self, serviceManager, salt, expiry)`.
        - Sign the raw digest with the operator key (r || s || v, v in {27, 28}).
        - `registerOperatorWithSignature({signature, salt, expiry}, self)`, wait for the receipt.
        - Any failure is logged; the agent goes on to monitoring.

    4> Monitor tasks.
        - Install a log filter for `NewTaskCreated` on the service manager, poll it every POLL_INTERVAL_MS.
        - For every decoded event log "New task detected: {name}" and start a donation task.
        - A log that fails to decode is logged and skipped.
        - A failed poll is logged and the filter dropped. The next poll installs a new filter
          from the first block not yet seen and fetches the missed logs thru `eth_getFilterLogs`.
        Example: "log filter reinstalled from block 1234, 2 missed logs"


//=====================================================================================================================

Donation task:

Purpose: donate 0.1 ETH to one task.

    1> `donateToTask(taskIndex)` with value = 0.1 ETH.
        - Gas is estimated unless GAS_LIMIT is set.
        - Pending nonce is read and the signed transaction sent under the per-key lock.

    2> Wait for the receipt (CONFIRMATION_TIMEOUT, default 300s).
        - status 0 is a revert.
        - Success or failure is logged; nothing is retried.
